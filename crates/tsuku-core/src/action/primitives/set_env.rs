//! `set_env`: declare environment entries that the generated runtime
//! wrapper exports, per spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `set_env`. Params: `vars` (string-to-string map), merged into
/// `ctx.env` for the generated wrapper and any later build step.
pub struct SetEnv;

#[async_trait]
impl Action for SetEnv {
    fn name(&self) -> &'static str {
        "set_env"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str_map("vars").is_none() {
            result.error("set_env requires a 'vars' string-to-string map");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let vars = params
            .get_str_map("vars")
            .ok_or_else(|| TsukuError::invalid_param("set_env", "missing 'vars'"))?;
        ctx.extend_env(vars.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Ok(())
    }
}
