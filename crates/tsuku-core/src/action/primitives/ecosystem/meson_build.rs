//! `meson_build`: configure with Meson, build with Ninja.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `meson_build`. Params: `path` (source dir relative to `work_dir`),
/// `bins[]`, optional `meson_args[]`.
pub struct MesonBuild;

#[async_trait]
impl Action for MesonBuild {
    fn name(&self) -> &'static str {
        "meson_build"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("meson_build requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("meson_build requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("meson_build", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("meson_build", "missing 'bins'"))?;
        let extra_args = params.get_str_list("meson_args").unwrap_or_default();
        let source_dir = ctx.work_dir.join(path);
        let build_dir = ctx.work_dir.join(".meson-build");

        let meson_home = common::find_toolchain(&ctx.tools_dir, "meson", "meson")
            .ok_or_else(|| TsukuError::invalid_param("meson_build", "no 'meson' toolchain found under tools_dir"))?;
        let meson = meson_home.join("bin/meson");

        let env = common::base_deterministic_env();
        let prefix_arg = format!("--prefix={}", ctx.install_dir.display());
        let build_dir_str = build_dir.display().to_string();

        let mut setup_args = vec!["setup", build_dir_str.as_str(), prefix_arg.as_str(), "--buildtype=release"];
        setup_args.extend(extra_args.iter().copied());

        common::run_build_command(
            ctx,
            meson.to_str().unwrap_or("meson"),
            &setup_args,
            &source_dir,
            &env,
            &ctx.work_dir.join("meson_setup.log"),
        )
        .await?;
        common::run_build_command(
            ctx,
            meson.to_str().unwrap_or("meson"),
            &["compile", "-C", &build_dir_str],
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("meson_compile.log"),
        )
        .await?;
        common::run_build_command(
            ctx,
            meson.to_str().unwrap_or("meson"),
            &["install", "-C", &build_dir_str],
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("meson_install.log"),
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
        let action = MesonBuild;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("path", ".").with("bins", vec!["tool".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
