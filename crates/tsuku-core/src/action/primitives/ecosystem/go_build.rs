//! `go_build`: build a module with `go build -trimpath` under
//! `GOFLAGS=-mod=mod`-free, offline-vendored conditions.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `go_build`. Params: `path` (module dir relative to `work_dir`),
/// `bins[]`, optional `package` (defaults to `./...`).
pub struct GoBuild;

#[async_trait]
impl Action for GoBuild {
    fn name(&self) -> &'static str {
        "go_build"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("path").is_none() {
            result.error("go_build requires a 'path' param");
        }
        if params.get_str_list("bins").is_none() {
            result.error("go_build requires a 'bins' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let path = params
            .get_str("path")
            .ok_or_else(|| TsukuError::invalid_param("go_build", "missing 'path'"))?;
        let bins = params
            .get_str_list("bins")
            .ok_or_else(|| TsukuError::invalid_param("go_build", "missing 'bins'"))?;
        let package = params.str_or("package", "./...");
        let source_dir = ctx.work_dir.join(path);

        let go_home = common::find_toolchain(&ctx.tools_dir, "go", "go")
            .ok_or_else(|| TsukuError::invalid_param("go_build", "no 'go' toolchain found under tools_dir"))?;
        let go = go_home.join("bin/go");

        let mut env = common::base_deterministic_env();
        env.insert("GOFLAGS".to_string(), "-mod=vendor -trimpath".to_string());
        env.insert("GO111MODULE".to_string(), "on".to_string());
        env.insert("CGO_ENABLED".to_string(), "0".to_string());
        env.insert("GOCACHE".to_string(), ctx.work_dir.join(".gocache").display().to_string());
        env.insert("GOBIN".to_string(), ctx.install_dir.join("bin").display().to_string());

        std::fs::create_dir_all(ctx.install_dir.join("bin"))?;
        common::run_build_command(
            ctx,
            go.to_str().unwrap_or("go"),
            &["install", package],
            &source_dir,
            &env,
            &ctx.work_dir.join("go_build.log"),
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
        let action = GoBuild;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new().with("path", ".").with("bins", vec!["hugo".to_string()]);
        assert!(action.preflight(&ok).is_ok());
    }
}
