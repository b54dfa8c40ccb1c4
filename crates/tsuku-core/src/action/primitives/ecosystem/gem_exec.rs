//! `gem_exec`: build a Ruby gem from `Gemfile.lock` via `bundle install
//! --deployment`, then wrap its executables.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::wrapper;

/// `gem_exec`. Params: `path` (dir containing `Gemfile`/`Gemfile.lock`,
/// relative to `work_dir`), `bins[]`.
pub struct GemExec;

#[async_trait]
impl Action for GemExec {
    fn name(&self) -> &'static str {
        "gem_exec"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("gem_exec requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("gem_exec requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("gem_exec", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("gem_exec", "missing 'bins'"))?;
        let source_dir = ctx.work_dir.join(path);

        let ruby_home = common::find_toolchain(&ctx.tools_dir, "ruby", "ruby")
            .ok_or_else(|| TsukuError::invalid_param("gem_exec", "no 'ruby' toolchain found under tools_dir"))?;
        let bundle = ruby_home.join("bin/bundle");
        let ruby = ruby_home.join("bin/ruby");
        let gem_home = ctx.install_dir.join("gems");

        let mut env = common::base_deterministic_env();
        env.insert("GEM_HOME".to_string(), gem_home.display().to_string());
        env.insert("BUNDLE_DEPLOYMENT".to_string(), "true".to_string());
        env.insert("BUNDLE_FROZEN".to_string(), "true".to_string());
        env.insert("BUNDLE_PATH".to_string(), gem_home.display().to_string());

        common::run_build_command(
            ctx,
            bundle.to_str().unwrap_or("bundle"),
            &["install", "--local"],
            &source_dir,
            &env,
            &ctx.work_dir.join("bundle_install.log"),
        )
        .await?;

        let bin_dir = ctx.install_dir.join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        for bin in &bins {
            let mut wrapper_env = std::collections::BTreeMap::new();
            wrapper_env.insert("GEM_HOME".to_string(), gem_home.display().to_string());
            wrapper_env.insert("BUNDLE_GEMFILE".to_string(), source_dir.join("Gemfile").display().to_string());
            let exec_script = source_dir.join("bin").join(bin);
            wrapper::write_absolute_exec_wrapper_with_runtime(&bin_dir, bin, ruby.to_str().unwrap_or("ruby"), &exec_script, &wrapper_env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_path_and_bins() {
        let action = GemExec;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("path", ".").with("bins", vec!["rubocop".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
