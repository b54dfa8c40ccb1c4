//! `pip_install`: build a Python tool from a hash-pinned `requirements.txt`
//! into an isolated venv, then wrap its console scripts.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::wrapper;

/// `pip_install`. Params: `requirements` (path relative to `work_dir`),
/// `bins[]` (console-script names to wrap).
pub struct PipInstall;

#[async_trait]
impl Action for PipInstall {
    fn name(&self) -> &'static str {
        "pip_install"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("requirements").is_none() {
            result.error("pip_install requires a 'requirements' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("pip_install requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let requirements = params
            .get_str("requirements")
            .ok_or_else(|| TsukuError::invalid_param("pip_install", "missing 'requirements'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("pip_install", "missing 'bins'"))?;
        let requirements_path = ctx.work_dir.join(requirements);

        let python_home = common::find_toolchain(&ctx.tools_dir, "python-standalone", "python3")
            .ok_or_else(|| TsukuError::invalid_param("pip_install", "no 'python-standalone' toolchain found under tools_dir"))?;
        let python = python_home.join("bin/python3");
        let venv_dir = ctx.install_dir.join("venv");

        let mut env = common::base_deterministic_env();
        env.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());
        env.insert("PYTHONHASHSEED".to_string(), "0".to_string());

        let venv_dir_str = venv_dir.display().to_string();
        common::run_build_command(
            ctx,
            python.to_str().unwrap_or("python3"),
            &["-m", "venv", &venv_dir_str],
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("venv_create.log"),
        )
        .await?;

        let venv_python = venv_dir.join("bin/python3");
        let requirements_str = requirements_path.display().to_string();
        common::run_build_command(
            ctx,
            venv_python.to_str().unwrap_or("python3"),
            &[
                "-m",
                "pip",
                "install",
                "--require-hashes",
                "--no-deps",
                "--only-binary",
                ":all:",
                "-r",
                &requirements_str,
            ],
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("pip_install.log"),
        )
        .await?;

        let bin_dir = ctx.install_dir.join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        for bin in &bins {
            let console_script = venv_dir.join("bin").join(bin);
            if !console_script.exists() {
                return Err(TsukuError::invalid_param(
                    "pip_install",
                    format!("console script '{bin}' was not installed into the venv"),
                ));
            }
            wrapper::write_absolute_exec_wrapper(&bin_dir, bin, &console_script, &std::collections::BTreeMap::new())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_requirements_and_bins() {
        let action = PipInstall;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("requirements", "requirements.txt").with("bins", vec!["black".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
