//! `download`: the simplest composite -- fetch one raw file (no archive)
//! and install it directly as a binary, per spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::{ExecutionContext, PlanContext};
use crate::action::registry::Action;
use crate::action::step::Step;
use crate::error::{PreflightResult, TsukuError};

/// `download`. Params: `url`, `binaries[]` (names the fetched file is
/// installed as; single-element unless `dest` renames it), optional
/// `checksum` + `checksum_algo`, optional `install_mode`.
pub struct Download;

#[async_trait]
impl Action for Download {
    fn name(&self) -> &'static str {
        "download"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        match params.get_str("url") {
            Some(url) if url.starts_with("https://") => {}
            Some(url) => result.error(format!("url must be https://, got '{url}'")),
            None => result.error("download requires a 'url' param"),
        }
        if params.get_str_list("binaries").is_none() {
            result.error("download requires a 'binaries' list of strings");
        }
        result
    }

    async fn execute(&self, _ctx: &ExecutionContext, _params: &ParamBag) -> Result<(), TsukuError> {
        unreachable!("download is a composite action; it must be decomposed before execution")
    }

    async fn decompose(&self, plan_ctx: &PlanContext, params: &ParamBag) -> Result<Option<Vec<Step>>, TsukuError> {
        let url = plan_ctx.expansion().expand(
            params
                .get_str("url")
                .ok_or_else(|| TsukuError::invalid_param("download", "missing 'url'"))?,
        );
        let binaries: Vec<String> = params
            .get_str_list("binaries")
            .ok_or_else(|| TsukuError::invalid_param("download", "missing 'binaries'"))?
            .into_iter()
            .map(str::to_string)
            .collect();
        let dest = binaries.first().cloned().unwrap_or_else(|| "download".to_string());

        let mut download = common::download_step(&url, &dest);
        if let Some(checksum) = params.get_str("checksum") {
            download.params.set("checksum", checksum);
            if let Some(algo) = params.get_str("checksum_algo") {
                download.params.set("checksum_algo", algo);
            }
        }

        Ok(Some(vec![
            download,
            common::chmod_step(&binaries),
            common::install_binaries_step(&binaries, params.get_str("install_mode")),
        ]))
    }
}
