//! `homebrew_relocate`: rewrite `@@HOMEBREW_PREFIX@@`/`@@HOMEBREW_CELLAR@@`
//! placeholders and binary RPATH under a directory, per spec.md §4.6.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::placeholder;

/// `homebrew_relocate`. Params: optional `dir` (relative to `work_dir`,
/// defaults to `work_dir` itself). The install path substituted in is
/// always `ctx.install_dir`.
pub struct HomebrewRelocate;

#[async_trait]
impl Action for HomebrewRelocate {
    fn name(&self) -> &'static str {
        "homebrew_relocate"
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let dir = match params.get_str("dir") {
            Some(d) => ctx.work_dir.join(d),
            None => ctx.work_dir.clone(),
        };
        let install_path = ctx.install_dir.display().to_string();
        placeholder::relocate_tree(&dir, &install_path, &ctx.cancellation).await?;
        Ok(())
    }
}
