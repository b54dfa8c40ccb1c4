//! `cmake_build`: configure then build with CMake + Make.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `cmake_build`. Params: `path` (source dir relative to `work_dir`),
/// `bins[]`, optional `cmake_args[]`.
pub struct CmakeBuild;

#[async_trait]
impl Action for CmakeBuild {
    fn name(&self) -> &'static str {
        "cmake_build"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("cmake_build requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("cmake_build requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("cmake_build", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("cmake_build", "missing 'bins'"))?;
        let extra_args = params.get_str_list("cmake_args").unwrap_or_default();
        let source_dir = ctx.work_dir.join(path);
        let build_dir = ctx.work_dir.join(".cmake-build");
        std::fs::create_dir_all(&build_dir)?;

        let cmake_home = common::find_toolchain(&ctx.tools_dir, "cmake", "cmake")
            .ok_or_else(|| TsukuError::invalid_param("cmake_build", "no 'cmake' toolchain found under tools_dir"))?;
        let cmake = cmake_home.join("bin/cmake");

        let env = common::base_deterministic_env();
        let install_prefix = format!("-DCMAKE_INSTALL_PREFIX={}", ctx.install_dir.display());
        let source_arg = format!("-S{}", source_dir.display());
        let build_arg = format!("-B{}", build_dir.display());

        let mut configure_args = vec![source_arg.as_str(), build_arg.as_str(), install_prefix.as_str(), "-DCMAKE_BUILD_TYPE=Release"];
        configure_args.extend(extra_args.iter().copied());

        common::run_build_command(
            ctx,
            cmake.to_str().unwrap_or("cmake"),
            &configure_args,
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("cmake_configure.log"),
        )
        .await?;

        let build_dir_str = build_dir.display().to_string();
        common::run_build_command(
            ctx,
            cmake.to_str().unwrap_or("cmake"),
            &["--build", &build_dir_str, "--target", "install"],
            &ctx.work_dir,
            &env,
            &ctx.work_dir.join("cmake_build.log"),
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
        let action = CmakeBuild;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("path", ".").with("bins", vec!["tool".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
