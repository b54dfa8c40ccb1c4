//! `configure_make`: the classic `./configure && make && make install`.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `configure_make`. Params: `path` (source dir relative to `work_dir`),
/// `bins[]`, optional `configure_args[]`.
pub struct ConfigureMake;

#[async_trait]
impl Action for ConfigureMake {
    fn name(&self) -> &'static str {
        "configure_make"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("configure_make requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("configure_make requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("configure_make", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("configure_make", "missing 'bins'"))?;
        let extra_args = params.get_str_list("configure_args").unwrap_or_default();
        let source_dir = ctx.work_dir.join(path);

        let make_home = common::find_toolchain(&ctx.tools_dir, "make", "make")
            .ok_or_else(|| TsukuError::invalid_param("configure_make", "no 'make' toolchain found under tools_dir"))?;
        let make = make_home.join("bin/make");

        let env = common::base_deterministic_env();
        let prefix_arg = format!("--prefix={}", ctx.install_dir.display());
        let mut configure_args = vec![prefix_arg.as_str()];
        configure_args.extend(extra_args.iter().copied());

        common::run_build_command(ctx, "./configure", &configure_args, &source_dir, &env, &ctx.work_dir.join("configure.log")).await?;
        common::run_build_command(ctx, make.to_str().unwrap_or("make"), &[], &source_dir, &env, &ctx.work_dir.join("make.log")).await?;
        common::run_build_command(ctx, make.to_str().unwrap_or("make"), &["install"], &source_dir, &env, &ctx.work_dir.join("make_install.log")).await?;

        common::verify_executables_exist(&ctx.install_dir, &bins)?;
        Ok(())
    }
}
