//! `link_dependencies`: expose a dependency's `lib`/`include` directories
//! to the current install via `ctx.env`, per spec.md §4.7.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `link_dependencies`. Params: `names[]` (keys into
/// `ctx.resolved_dependencies`); exports each one's
/// `libs_dir/<name>-<version>/{lib,include}` onto `PKG_CONFIG_PATH`,
/// `CPPFLAGS`, and `LDFLAGS`.
pub struct LinkDependencies;

#[async_trait]
impl Action for LinkDependencies {
    fn name(&self) -> &'static str {
        "link_dependencies"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str_list("names").is_none() {
            result.error("link_dependencies requires a 'names' list of strings");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let names = params
            .get_str_list("names")
            .ok_or_else(|| TsukuError::invalid_param("link_dependencies", "missing 'names'"))?;

        let mut pkg_config_path = Vec::new();
        let mut cppflags = Vec::new();
        let mut ldflags = Vec::new();

        for name in names {
            let version = ctx
                .resolved_dependencies
                .get(name)
                .ok_or_else(|| TsukuError::invalid_param("link_dependencies", format!("unresolved dependency '{name}'")))?;
            let dep_root = ctx.libs_dir.join(format!("{name}-{version}"));

            pkg_config_path.push(dep_root.join("lib/pkgconfig").display().to_string());
            cppflags.push(format!("-I{}", dep_root.join("include").display()));
            ldflags.push(format!("-L{}", dep_root.join("lib").display()));
        }

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
