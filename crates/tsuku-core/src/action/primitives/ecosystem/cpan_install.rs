//! `cpan_install`: build a Perl distribution with `cpanm --local-lib`
//! against a pinned `cpanfile.snapshot`.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::wrapper;

/// `cpan_install`. Params: `path` (dir containing `cpanfile`/
/// `cpanfile.snapshot`, relative to `work_dir`), `bins[]`.
pub struct CpanInstall;

#[async_trait]
impl Action for CpanInstall {
    fn name(&self) -> &'static str {
        "cpan_install"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("cpan_install requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("cpan_install requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("cpan_install", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("cpan_install", "missing 'bins'"))?;
        let source_dir = ctx.work_dir.join(path);

        let perl_home = common::find_toolchain(&ctx.tools_dir, "perl", "perl")
            .ok_or_else(|| TsukuError::invalid_param("cpan_install", "no 'perl' toolchain found under tools_dir"))?;
        let cpanm = perl_home.join("bin/cpanm");
        let perl = perl_home.join("bin/perl");
        let local_lib = ctx.install_dir.join("lib/perl5");

        let mut env = common::base_deterministic_env();
        // Clear inherited Perl state so the build only sees the pinned
        // toolchain and snapshot, per spec.md §4.5's deterministic-env step.
        env.insert("PERL5LIB".to_string(), String::new());
        env.insert("PERL_MM_USE_DEFAULT".to_string(), "1".to_string());
        env.insert("PERL_CPANM_OPT".to_string(), String::new());

        let local_lib_str = local_lib.display().to_string();
        common::run_build_command(
            ctx,
            cpanm.to_str().unwrap_or("cpanm"),
            &["--local-lib", &local_lib_str, "--installdeps", "--notest", "--from", ".", "."],
            &source_dir,
            &env,
            &ctx.work_dir.join("cpanm_install.log"),
        )
        .await?;

        let bin_dir = ctx.install_dir.join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        for bin in &bins {
            let mut wrapper_env = std::collections::BTreeMap::new();
            wrapper_env.insert("PERL5LIB".to_string(), local_lib.join("lib/perl5").display().to_string());
            let exec_script = source_dir.join("bin").join(bin);
            wrapper::write_absolute_exec_wrapper_with_runtime(&bin_dir, bin, perl.to_str().unwrap_or("perl"), &exec_script, &wrapper_env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_path_and_bins() {
        let action = CpanInstall;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("path", ".").with("bins", vec!["cpanm-tool".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
