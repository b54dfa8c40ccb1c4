//! `npm_exec`: install an npm package from a lockfile into an isolated
//! tree, then wrap its `bin` entrypoint.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::wrapper;

/// `npm_exec`. Params: `path` (dir containing `package.json`/
/// `package-lock.json`, relative to `work_dir`), `bins[]` (names under
/// `node_modules/.bin` to wrap).
pub struct NpmExec;

#[async_trait]
impl Action for NpmExec {
    fn name(&self) -> &'static str {
        "npm_exec"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("npm_exec requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("npm_exec requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("npm_exec", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("npm_exec", "missing 'bins'"))?;
        let source_dir = ctx.work_dir.join(path);

        let node_home = common::find_toolchain(&ctx.tools_dir, "nodejs", "node")
            .ok_or_else(|| TsukuError::invalid_param("npm_exec", "no 'nodejs' toolchain found under tools_dir"))?;
        let npm = node_home.join("bin/npm");
        let node = node_home.join("bin/node");

        let mut env = common::base_deterministic_env();
        env.insert("npm_config_cache".to_string(), ctx.work_dir.join(".npm-cache").display().to_string());

        common::run_build_command(
            ctx,
            npm.to_str().unwrap_or("npm"),
            &["ci", "--omit=dev", "--no-audit", "--no-fund", "--ignore-scripts"],
            &source_dir,
            &env,
            &ctx.work_dir.join("npm_ci.log"),
        )
        .await?;

        let bin_dir = ctx.install_dir.join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        for bin in &bins {
            let script = source_dir.join("node_modules/.bin").join(bin);
            if !script.exists() {
                return Err(TsukuError::invalid_param("npm_exec", format!("'{bin}' was not produced under node_modules/.bin")));
            }
            let mut wrapper_env = std::collections::BTreeMap::new();
            wrapper_env.insert("NODE_PATH".to_string(), source_dir.join("node_modules").display().to_string());
            wrapper::write_absolute_exec_wrapper_with_runtime(&bin_dir, bin, node.to_str().unwrap_or("node"), &script, &wrapper_env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_path_and_bins() {
        let action = NpmExec;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("path", ".").with("bins", vec!["eslint".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
