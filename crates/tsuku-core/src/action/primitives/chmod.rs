//! `chmod`: apply a Unix mode to a list of files under `work_dir`.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `chmod`. Params: `files[]`, optional octal `mode` (default `0o755`).
pub struct Chmod;

#[async_trait]
impl Action for Chmod {
    fn name(&self) -> &'static str {
        "chmod"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str_list("files").is_none() {
            result.error("chmod requires a 'files' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let files = params
            .get_str_list("files")
            .ok_or_else(|| TsukuError::invalid_param("chmod", "missing 'files'"))?;
        let mode = params.get_int("mode").unwrap_or(0o755) as u32;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for file in files {
                let path = ctx.work_dir.join(file);
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))?;
            }
        }
        #[cfg(not(unix))]
        {
            let _ = (mode, files);
        }

        Ok(())
    }
}
