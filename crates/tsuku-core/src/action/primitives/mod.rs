//! The closed set of primitive (directly-executing) actions, per spec.md
//! §3/§4. Each submodule implements one entry from
//! [`super::registry::PRIMITIVE_NAMES`].

mod apply_patch_file;
mod chmod;
mod download_file;
mod ecosystem;
mod extract;
mod homebrew_relocate;
mod install_binaries;
mod install_libraries;
mod install_tree;
mod link_dependencies;
mod set_env;
mod set_rpath;
mod setup_build_env;
mod text_replace;

use std::sync::Arc;

use apply_patch_file::ApplyPatchFile;
use chmod::Chmod;
use download_file::DownloadFile;
use extract::Extract;
use homebrew_relocate::HomebrewRelocate;
use install_binaries::InstallBinaries;
use install_libraries::InstallLibraries;
use link_dependencies::LinkDependencies;
use set_env::SetEnv;
use set_rpath::SetRpath;
use setup_build_env::SetupBuildEnv;
use text_replace::TextReplace;

use super::registry::Registry;

/// Register every primitive action this crate implements.
pub(crate) fn register_all(registry: &mut Registry) {
    registry.register(Arc::new(DownloadFile));
    registry.register(Arc::new(Extract));
    registry.register(Arc::new(Chmod));
    registry.register(Arc::new(InstallBinaries));
    registry.register(Arc::new(InstallLibraries));
    registry.register(Arc::new(SetEnv));
    registry.register(Arc::new(SetRpath));
    registry.register(Arc::new(LinkDependencies));
    registry.register(Arc::new(ApplyPatchFile));
    registry.register(Arc::new(TextReplace));
    registry.register(Arc::new(HomebrewRelocate));
    registry.register(Arc::new(SetupBuildEnv));
    ecosystem::register_all(registry);
}
