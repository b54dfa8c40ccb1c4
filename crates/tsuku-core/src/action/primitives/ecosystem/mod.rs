//! Ecosystem build primitives: each wraps a language/package-manager's
//! native build or install step with a deterministic environment and a
//! relocatable `install_dir/bin` result, per spec.md §4.5.

mod common;

mod cargo_build;
mod cmake_build;
mod configure_make;
mod cpan_install;
mod gem_exec;
mod go_build;
mod install_gem_direct;
mod meson_build;
mod nix_realize;
mod npm_exec;
mod pip_exec;
mod pip_install;

pub use cargo_build::CargoBuild;
pub use cmake_build::CmakeBuild;
pub use configure_make::ConfigureMake;
pub use cpan_install::CpanInstall;
pub use gem_exec::GemExec;
pub use go_build::GoBuild;
pub use install_gem_direct::InstallGemDirect;
pub use meson_build::MesonBuild;
pub use nix_realize::NixRealize;
pub use npm_exec::NpmExec;
pub use pip_exec::PipExec;
pub use pip_install::PipInstall;

use std::sync::Arc;

use crate::action::registry::Registry;

/// Register every ecosystem build primitive under its name.
pub(crate) fn register_all(registry: &mut Registry) {
    registry.register(Arc::new(CargoBuild));
    registry.register(Arc::new(CmakeBuild));
    registry.register(Arc::new(ConfigureMake));
    registry.register(Arc::new(CpanInstall));
    registry.register(Arc::new(GemExec));
    registry.register(Arc::new(GoBuild));
    registry.register(Arc::new(InstallGemDirect));
    registry.register(Arc::new(MesonBuild));
    registry.register(Arc::new(NixRealize));
    registry.register(Arc::new(NpmExec));
    registry.register(Arc::new(PipExec));
    registry.register(Arc::new(PipInstall));
}
