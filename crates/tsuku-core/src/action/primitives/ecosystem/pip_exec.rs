//! `pip_exec`: install a single hash-pinned wheel with `pip install
//! --target`, then wrap its entrypoint as `python -m <module>`.
//!
//! Lighter than `pip_install`: no venv, for tools that are a single
//! importable module rather than a project with its own console scripts.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::wrapper;

/// `pip_exec`. Params: `package` (pip requirement spec, e.g.
/// `black==24.1.0`), `package_hash` (`--hash=sha256:...` value), `module`
/// (the importable module to run), `bin` (the wrapper name to create).
pub struct PipExec;

#[async_trait]
impl Action for PipExec {
    fn name(&self) -> &'static str {
        "pip_exec"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        for key in ["package", "package_hash", "module", "bin"] {
            if params.get_str(key).is_none() {
                result.error(format!("pip_exec requires a '{key}' string param"));
            }
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let package = params
            .get_str("package")
            .ok_or_else(|| TsukuError::invalid_param("pip_exec", "missing 'package'"))?;
        let package_hash = params
            .get_str("package_hash")
            .ok_or_else(|| TsukuError::invalid_param("pip_exec", "missing 'package_hash'"))?;
        let module = params
            .get_str("module")
            .ok_or_else(|| TsukuError::invalid_param("pip_exec", "missing 'module'"))?;
        let bin = params
            .get_str("bin")
            .ok_or_else(|| TsukuError::invalid_param("pip_exec", "missing 'bin'"))?;

        let python_home = common::find_toolchain(&ctx.tools_dir, "python-standalone", "python3")
            .ok_or_else(|| TsukuError::invalid_param("pip_exec", "no 'python-standalone' toolchain found under tools_dir"))?;
        let python = python_home.join("bin/python3");
        let target_dir = ctx.install_dir.join("lib/python");

        let mut env = common::base_deterministic_env();
        env.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());

        let requirement = format!("{package} --hash=sha256:{package_hash}");
        let target_dir_str = target_dir.display().to_string();
        common::run_build_command(
            ctx,
            python.to_str().unwrap_or("python3"),
            &[
                "-m",
                "pip",
                "install",
                "--require-hashes",
                "--no-deps",
                "--only-binary",
                ":all:",
                "--target",
                &target_dir_str,
                &requirement,
            ],
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("pip_exec.log"),
        )
        .await?;

        let bin_dir = ctx.install_dir.join("bin");
        std::fs::create_dir_all(&bin_dir)?;

        let mut wrapper_env = std::collections::BTreeMap::new();
        wrapper_env.insert("PYTHONPATH".to_string(), target_dir.display().to_string());
        wrapper::write_module_exec_wrapper(&bin_dir, bin, python.to_str().unwrap_or("python3"), module, &wrapper_env)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_all_params() {
        let action = PipExec;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new()
            .with("package", "black==24.1.0")
            .with("package_hash", "a".repeat(64))
            .with("module", "black")
            .with("bin", "black");
        assert!(action.preflight(&ok).is_ok());
    }
}
