//! `install_binaries`: place executables into `install_dir/bin`, per
//! spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::install_tree::{self, InstallMode};
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `install_binaries`. Params: `files[]` (bare names or `{src, dest}`
/// pairs), `install_mode` (`binaries` default, `directory`,
/// `directory_wrapped`).
pub struct InstallBinaries;

#[async_trait]
impl Action for InstallBinaries {
    fn name(&self) -> &'static str {
        "install_binaries"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        let mode = params.get_str("install_mode");
        if mode.unwrap_or("binaries") == "binaries" && install_tree::parse_file_entries(params, "files").is_err() {
            result.error("install_binaries in 'binaries' mode requires a 'files' list");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let mode = InstallMode::parse(params.get_str("install_mode"))?;

        match mode {
            InstallMode::Binaries => {
                let entries = install_tree::parse_file_entries(params, "files")?;
                install_tree::install_flat_files(&ctx.work_dir, &ctx.install_dir, "bin", &entries)?;
            }
            InstallMode::Directory | InstallMode::DirectoryWrapped => {
                install_tree::install_directory_tree(&ctx.work_dir, &ctx.install_dir, &ctx.recipe.name)?;
                // Entrypoint wrapper generation for `directory_wrapped` is
                // driven by `set_rpath`/ecosystem steps, which know the
                // real runtime and entrypoint names; this primitive only
                // places the tree.
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_listed_files_into_install_bin() {
        let work = tempdir().unwrap();
        std::fs::write(work.path().join("rg"), b"binary").unwrap();

        let ctx = crate::action::context::test_support::execution_context(work.path());
        let action = InstallBinaries;
        let params = ParamBag::new().with("files", vec!["rg".to_string()]);
        action.execute(&ctx, &params).await.unwrap();

        assert!(ctx.install_dir.join("bin/rg").exists());
    }

    #[test]
    fn preflight_requires_files_in_binaries_mode() {
        let action = InstallBinaries;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        assert!(action.preflight(&ParamBag::new().with("files", vec!["rg".to_string()])).is_ok());
    }
}
