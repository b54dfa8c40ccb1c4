//! Composite actions: decomposed into primitive [`Step`](super::step::Step)
//! sequences at plan time, per spec.md §4.5.

mod common;

mod download;
mod download_archive;
mod github_archive;
mod github_file;
mod homebrew_bottle;
mod nix_install;

pub use download::Download;
pub use download_archive::DownloadArchive;
pub use github_archive::GithubArchive;
pub use github_file::GithubFile;
pub use homebrew_bottle::HomebrewBottle;
pub use nix_install::NixInstall;

use std::sync::Arc;

use super::registry::Registry;

/// Register every composite action this crate implements.
pub(crate) fn register_all(registry: &mut Registry) {
    registry.register(Arc::new(Download));
    registry.register(Arc::new(DownloadArchive));
    registry.register(Arc::new(GithubArchive));
    registry.register(Arc::new(GithubFile));
    registry.register(Arc::new(HomebrewBottle));
    registry.register(Arc::new(NixInstall));
}
