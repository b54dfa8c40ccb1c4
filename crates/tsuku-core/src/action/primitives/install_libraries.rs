//! `install_libraries`: place shared libraries/headers into
//! `install_dir/lib`, per spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::install_tree::{self, InstallMode};
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `install_libraries`. Same param shape as `install_binaries`, targeting
/// `install_dir/lib` in `binaries` mode.
pub struct InstallLibraries;

#[async_trait]
impl Action for InstallLibraries {
    fn name(&self) -> &'static str {
        "install_libraries"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        let mode = params.get_str("install_mode");
        if mode.unwrap_or("binaries") == "binaries" && install_tree::parse_file_entries(params, "files").is_err() {
            result.error("install_libraries in 'binaries' mode requires a 'files' list");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let mode = InstallMode::parse(params.get_str("install_mode"))?;

        match mode {
            InstallMode::Binaries => {
                let entries = install_tree::parse_file_entries(params, "files")?;
                install_tree::install_flat_files(&ctx.work_dir, &ctx.install_dir, "lib", &entries)?;
            }
            InstallMode::Directory | InstallMode::DirectoryWrapped => {
                install_tree::install_directory_tree(&ctx.work_dir, &ctx.install_dir, &ctx.recipe.name)?;
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
    async fn copies_listed_files_into_install_lib() {
        let work = tempdir().unwrap();
        std::fs::write(work.path().join("libyaml.so"), b"binary").unwrap();

        let ctx = crate::action::context::test_support::execution_context(work.path());
        let action = InstallLibraries;
        let params = ParamBag::new().with("files", vec!["libyaml.so".to_string()]);
        action.execute(&ctx, &params).await.unwrap();

        assert!(ctx.install_dir.join("lib/libyaml.so").exists());
    }
}
