//! `nix_install`: the user-facing composite around `nix_realize`, per
//! spec.md §4.5: "`nix_install` composes into a `nix_realize` primitive
//! parameterized by a pre-captured flake lock."

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::{ExecutionContext, PlanContext};
use crate::action::registry::Action;
use crate::action::step::Step;
use crate::error::{PreflightResult, TsukuError};

/// `nix_install`. Params: `locked_ref` (a fully locked flake reference
/// captured at plan time, e.g. `github:NixOS/nixpkgs/<rev>#hello`),
/// `bin` (the wrapper name).
pub struct NixInstall;

#[async_trait]
impl Action for NixInstall {
    fn name(&self) -> &'static str {
        "nix_install"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("locked_ref").is_none() {
            result.error("nix_install requires a 'locked_ref' param");
        }
        if params.get_str("bin").is_none() {
            result.error("nix_install requires a 'bin' param");
        }
        result
    }

    async fn execute(&self, _ctx: &ExecutionContext, _params: &ParamBag) -> Result<(), TsukuError> {
        unreachable!("nix_install is a composite action; it must be decomposed before execution")
    }

    async fn decompose(&self, _plan_ctx: &PlanContext, params: &ParamBag) -> Result<Option<Vec<Step>>, TsukuError> {
        Ok(Some(vec![Step::new("nix_realize", params.clone())]))
    }
}
