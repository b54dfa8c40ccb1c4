//! `install_gem_direct`: install a single pinned gem with `gem install
//! --local`, bypassing Bundler, for tools shipped as one gem with no
//! Gemfile.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::wrapper;

/// `install_gem_direct`. Params: `gem_file` (a `.gem` path relative to
/// `work_dir`), `bins[]`.
pub struct InstallGemDirect;

#[async_trait]
impl Action for InstallGemDirect {
    fn name(&self) -> &'static str {
        "install_gem_direct"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("gem_file").is_none() {
            result.error("install_gem_direct requires a 'gem_file' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("install_gem_direct requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let gem_file = params
            .get_str("gem_file")
            .ok_or_else(|| TsukuError::invalid_param("install_gem_direct", "missing 'gem_file'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("install_gem_direct", "missing 'bins'"))?;
        let gem_path = ctx.work_dir.join(gem_file);

        let ruby_home = common::find_toolchain(&ctx.tools_dir, "ruby", "ruby")
            .ok_or_else(|| TsukuError::invalid_param("install_gem_direct", "no 'ruby' toolchain found under tools_dir"))?;
        let gem = ruby_home.join("bin/gem");
        let ruby = ruby_home.join("bin/ruby");
        let gem_home = ctx.install_dir.join("gems");

        let mut env = common::base_deterministic_env();
        env.insert("GEM_HOME".to_string(), gem_home.display().to_string());

        let gem_path_str = gem_path.display().to_string();
        common::run_build_command(
            ctx,
            gem.to_str().unwrap_or("gem"),
            &["install", "--local", "--no-document", &gem_path_str],
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("gem_install.log"),
        )
        .await?;

        let bin_dir = ctx.install_dir.join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        for bin in &bins {
            let mut wrapper_env = std::collections::BTreeMap::new();
            wrapper_env.insert("GEM_HOME".to_string(), gem_home.display().to_string());
            let exec_script = gem_home.join("bin").join(bin);
            wrapper::write_absolute_exec_wrapper_with_runtime(&bin_dir, bin, ruby.to_str().unwrap_or("ruby"), &exec_script, &wrapper_env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_gem_file_and_bins() {
        let action = InstallGemDirect;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("gem_file", "tool-1.0.gem").with("bins", vec!["tool".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
