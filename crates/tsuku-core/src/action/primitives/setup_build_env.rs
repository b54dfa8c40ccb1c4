//! `setup_build_env`: probe an install-time dependency's toolchain layout
//! and accumulate env/paths for later steps, per spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `setup_build_env`. Params: `names[]`, dependency names to probe under
/// `tools_dir`/`libs_dir`. For each, if a `<name>-<version>/bin` exists it
/// is prepended to `exec_paths`; `lib`, `lib/pkgconfig`, and `include` are
/// folded into `PKG_CONFIG_PATH`/`CPPFLAGS`/`LDFLAGS` when present.
pub struct SetupBuildEnv;

#[async_trait]
impl Action for SetupBuildEnv {
    fn name(&self) -> &'static str {
        "setup_build_env"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str_list("names").is_none() {
            result.error("setup_build_env requires a 'names' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let names = params
            .get_str_list("names")
            .ok_or_else(|| TsukuError::invalid_param("setup_build_env", "missing 'names'"))?;

        let mut exec_paths = Vec::new();
        let mut pkg_config_path = Vec::new();
        let mut cppflags = Vec::new();
        let mut ldflags = Vec::new();

        for name in names {
            let version = ctx
                .resolved_dependencies
                .get(name)
                .ok_or_else(|| TsukuError::invalid_param("setup_build_env", format!("unresolved dependency '{name}'")))?;

            let root = latest_matching_root(&ctx.tools_dir, name, version)
                .or_else(|| latest_matching_root(&ctx.libs_dir, name, version))
                .unwrap_or_else(|| ctx.tools_dir.join(format!("{name}-{version}")));

            let bin = root.join("bin");
            if bin.is_dir() {
                exec_paths.push(bin);
            }
            let pkgconfig = root.join("lib/pkgconfig");
            if pkgconfig.is_dir() {
                pkg_config_path.push(pkgconfig.display().to_string());
            }
            let include = root.join("include");
            if include.is_dir() {
                cppflags.push(format!("-I{}", include.display()));
            }
            let lib = root.join("lib");
            if lib.is_dir() {
                ldflags.push(format!("-L{}", lib.display()));
            }
        }

        ctx.extend_exec_paths(exec_paths);

        let mut vars = std::collections::BTreeMap::new();
        if !pkg_config_path.is_empty() {
            vars.insert("PKG_CONFIG_PATH".to_string(), pkg_config_path.join(":"));
        }
        if !cppflags.is_empty() {
            vars.insert("CPPFLAGS".to_string(), cppflags.join(" "));
        }
        if !ldflags.is_empty() {
            vars.insert("LDFLAGS".to_string(), ldflags.join(" "));
        }
        ctx.extend_env(vars);
        Ok(())
    }
}

/// A toolchain's install root is expected at `<dir>/<name>-<version>`;
/// fall back to `None` if it isn't there so the caller can try the other
/// tree (`tools_dir` vs `libs_dir`).
fn latest_matching_root(dir: &std::path::Path, name: &str, version: &str) -> Option<std::path::PathBuf> {
    let candidate = dir.join(format!("{name}-{version}"));
    candidate.is_dir().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn accumulates_bin_path_and_pkgconfig_for_dependency() {
        let work = tempdir().unwrap();
        let mut ctx = crate::action::context::test_support::execution_context(work.path());
        ctx.resolved_dependencies.insert("zig".to_string(), "0.13.0".to_string());
        let toolchain = ctx.tools_dir.join("zig-0.13.0/bin");
        std::fs::create_dir_all(&toolchain).unwrap();

        let action = SetupBuildEnv;
        let params = ParamBag::new().with("names", vec!["zig".to_string()]);
        action.execute(&ctx, &params).await.unwrap();

        assert_eq!(ctx.exec_paths_snapshot(), vec![toolchain]);
    }

    #[tokio::test]
    async fn errors_on_unresolved_dependency_name() {
        let work = tempdir().unwrap();
        let ctx = crate::action::context::test_support::execution_context(work.path());
        let action = SetupBuildEnv;
        let params = ParamBag::new().with("names", vec!["missing".to_string()]);
        assert!(action.execute(&ctx, &params).await.is_err());
    }
}
