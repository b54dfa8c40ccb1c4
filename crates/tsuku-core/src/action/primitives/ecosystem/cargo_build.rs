//! `cargo_build`: build a crate with `cargo build --locked --offline`.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::verify::hash::{self, Algo};
use crate::verify::VerifyError;

/// `cargo_build`. Params: `path` (source dir relative to `work_dir`),
/// `bins[]` (expected `install_dir/bin/<name>` outputs), optional
/// `lock_data`/`lock_checksum` (a pinned `Cargo.lock` the build must use
/// verbatim, checked against `lock_checksum` before being written).
pub struct CargoBuild;

#[async_trait]
impl Action for CargoBuild {
    fn name(&self) -> &'static str {
        "cargo_build"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("cargo_build requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("cargo_build requires a 'bins' list of strings");
        }
        let has_data = params.get_str("lock_data").is_some();
        let has_checksum = params.get_str("lock_checksum").is_some();
        if has_data != has_checksum {
            result.error("cargo_build's 'lock_data' and 'lock_checksum' must be given together");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("cargo_build", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("cargo_build", "missing 'bins'"))?;
        let source_dir = ctx.work_dir.join(path);

        if let (Some(lock_data), Some(lock_checksum)) = (params.get_str("lock_data"), params.get_str("lock_checksum")) {
            let tmp_lock = ctx.work_dir.join(".tsuku-lock-check.tmp");
            std::fs::write(&tmp_lock, lock_data)?;
            let actual = hash::hash_file(&tmp_lock, Algo::Sha256)?;
            std::fs::remove_file(&tmp_lock)?;
            if !actual.eq_ignore_ascii_case(lock_checksum) {
                return Err(VerifyError::Mismatch {
                    expected: lock_checksum.to_string(),
                    actual,
                }
                .into());
            }
            std::fs::write(source_dir.join("Cargo.lock"), lock_data)?;
        }

        let rust_home = common::find_toolchain(&ctx.tools_dir, "rust", "cargo")
            .ok_or_else(|| TsukuError::invalid_param("cargo_build", "no 'rust' toolchain found under tools_dir"))?;
        let cargo = rust_home.join("bin/cargo");

        let mut env = common::base_deterministic_env();
        env.insert("CARGO_HOME".to_string(), ctx.work_dir.join(".cargo-home").display().to_string());
        env.insert("CARGO_INCREMENTAL".to_string(), "0".to_string());
        env.insert("RUSTFLAGS".to_string(), "-C embed-bitcode=no".to_string());

        let install_dir_str = ctx.install_dir.display().to_string();
        common::run_build_command(
            ctx,
            cargo.to_str().unwrap_or("cargo"),
            &["install", "--locked", "--offline", "--path", ".", "--root", &install_dir_str],
            &source_dir,
            &env,
            &ctx.work_dir.join("cargo_build.log"),
        )
        .await?;

        common::verify_executables_exist(&ctx.install_dir, &bins)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_path_and_bins() {
        let action = CargoBuild;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("path", ".").with("bins", vec!["rg".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }

    #[test]
    fn preflight_rejects_lock_data_without_checksum() {
        let action = CargoBuild;
        let params = ParamBag::new().with("path", ".").with("bins", vec!["rg".to_string()]).with("lock_data", "...");
        assert!(!action.preflight(&params).is_ok());
    }
}
