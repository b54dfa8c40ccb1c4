//! `apply_patch_file`: apply a unified diff to `work_dir` via the `patch`
//! subprocess, per spec.md §4.5.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `apply_patch_file`. Params: exactly one of `file` (path relative to
/// `work_dir`) or `data` (inline patch text); optional `subdir` (must stay
/// inside `work_dir`); `strip` (default `1`, the `-p<n>` argument).
pub struct ApplyPatchFile;

fn validate_subdir(subdir: &str) -> Result<(), String> {
    let path = Path::new(subdir);
    if path.is_absolute() || path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(format!("'subdir' must be a relative path with no '..' components, got '{subdir}'"));
    }
    Ok(())
}

#[async_trait]
impl Action for ApplyPatchFile {
    fn name(&self) -> &'static str {
        "apply_patch_file"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        let has_file = params.get_str("file").is_some();
        let has_data = params.get_str("data").is_some();
        if has_file == has_data {
            result.error("apply_patch_file requires exactly one of 'file' or 'data'");
        }
        if let Some(subdir) = params.get_str("subdir") {
            if let Err(msg) = validate_subdir(subdir) {
                result.error(msg);
            }
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let cwd = match params.get_str("subdir") {
            Some(subdir) => {
                validate_subdir(subdir).map_err(|msg| TsukuError::invalid_param("apply_patch_file", msg))?;
                ctx.work_dir.join(subdir)
            }
            None => ctx.work_dir.clone(),
        };
        let strip = params.get_int("strip").unwrap_or(1);

        let patch_path = match (params.get_str("file"), params.get_str("data")) {
            (Some(file), None) => ctx.work_dir.join(file),
            (None, Some(data)) => {
                let tmp = ctx.work_dir.join(".tsuku-patch.tmp");
                std::fs::write(&tmp, data)?;
                tmp
            }
            _ => return Err(TsukuError::invalid_param("apply_patch_file", "requires exactly one of 'file' or 'data'")),
        };

        let mut cmd = Command::new("patch");
        cmd.arg(format!("-p{strip}")).arg("-i").arg(&patch_path).current_dir(&cwd);
        let output = crate::subprocess::output(cmd, &ctx.cancellation).await?;

        if params.get_str("data").is_some() {
            let _ = std::fs::remove_file(&patch_path);
        }

        if !output.status.success() {
            return Err(TsukuError::SubprocessFailure {
                command: format!("patch -p{strip} -i {}", patch_path.display()),
                exit_code: output.status.code(),
                output: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_rejects_both_file_and_data() {
        let action = ApplyPatchFile;
        let params = ParamBag::new().with("file", "a.patch").with("data", "diff");
        assert!(!action.preflight(&params).is_ok());
    }

    #[test]
    fn preflight_rejects_neither_file_nor_data() {
        let action = ApplyPatchFile;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
    }

    #[test]
    fn preflight_rejects_traversal_subdir() {
        let action = ApplyPatchFile;
        let params = ParamBag::new().with("file", "a.patch").with("subdir", "../escape");
        assert!(!action.preflight(&params).is_ok());
    }

    #[test]
    fn preflight_accepts_single_source_and_plain_subdir() {
        let action = ApplyPatchFile;
        let params = ParamBag::new().with("file", "a.patch").with("subdir", "src");
        assert!(action.preflight(&params).is_ok());
    }
}
