//! `download_archive`: fetch an arbitrary URL, extract it, then install
//! the listed binaries, per spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::{ExecutionContext, PlanContext};
use crate::action::registry::Action;
use crate::action::step::Step;
use crate::error::{PreflightResult, TsukuError};

/// `download_archive`. Params: `url`, `format` (`auto` by filename suffix
/// if absent), `strip_dirs`, `binaries[]`, optional `checksum` +
/// `checksum_algo`, optional `install_mode`.
pub struct DownloadArchive;

#[async_trait]
impl Action for DownloadArchive {
    fn name(&self) -> &'static str {
        "download_archive"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        match params.get_str("url") {
            Some(url) if url.starts_with("https://") => {}
            Some(url) => result.error(format!("url must be https://, got '{url}'")),
            None => result.error("download_archive requires a 'url' param"),
        }
        if params.get_str_list("binaries").is_none() {
            result.error("download_archive requires a 'binaries' list of strings");
        }
        result
    }

    async fn execute(&self, _ctx: &ExecutionContext, _params: &ParamBag) -> Result<(), TsukuError> {
        unreachable!("download_archive is a composite action; it must be decomposed before execution")
    }

    async fn decompose(&self, plan_ctx: &PlanContext, params: &ParamBag) -> Result<Option<Vec<Step>>, TsukuError> {
        let url = plan_ctx.expansion().expand(
            params
                .get_str("url")
                .ok_or_else(|| TsukuError::invalid_param("download_archive", "missing 'url'"))?,
        );
        let binaries: Vec<String> = params
            .get_str_list("binaries")
            .ok_or_else(|| TsukuError::invalid_param("download_archive", "missing 'binaries'"))?
            .into_iter()
            .map(str::to_string)
            .collect();

        let dest_name = url.rsplit('/').next().unwrap_or("archive").to_string();
        let format = params
            .get_str("format")
            .filter(|f| *f != "auto")
            .map(str::to_string)
            .or_else(|| common::format_for_filename(&dest_name).map(str::to_string));
        let strip_dirs = params.get_int("strip_dirs");

        let mut download = common::download_step(&url, &dest_name);
        if let Some(checksum) = params.get_str("checksum") {
            download.params.set("checksum", checksum);
            if let Some(algo) = params.get_str("checksum_algo") {
                download.params.set("checksum_algo", algo);
            }
        }

        Ok(Some(vec![
            download,
            common::extract_step(&dest_name, format.as_deref(), strip_dirs),
            common::chmod_step(&binaries),
            common::install_binaries_step(&binaries, params.get_str("install_mode")),
        ]))
    }
}
