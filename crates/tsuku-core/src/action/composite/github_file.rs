//! `github_file`: fetch a single raw (non-archived) asset from a GitHub
//! release and install it directly, per spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::{ExecutionContext, PlanContext};
use crate::action::registry::Action;
use crate::action::step::Step;
use crate::error::{PreflightResult, TsukuError};

/// `github_file`. Params: `repo` (`owner/name`), `asset_pattern`
/// (`{version}`/`{arch}`/`{os}`-templated), `binaries[]` (the name the
/// fetched file is installed as), optional `install_mode`.
pub struct GithubFile;

#[async_trait]
impl Action for GithubFile {
    fn name(&self) -> &'static str {
        "github_file"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("repo").is_none() {
            result.error("github_file requires a 'repo' param");
        }
        if params.get_str("asset_pattern").is_none() {
            result.error("github_file requires an 'asset_pattern' param");
        }
        if params.get_str_list("binaries").is_none() {
            result.error("github_file requires a 'binaries' list of strings");
        }
        result
    }

    async fn execute(&self, _ctx: &ExecutionContext, _params: &ParamBag) -> Result<(), TsukuError> {
        unreachable!("github_file is a composite action; it must be decomposed before execution")
    }

    async fn decompose(&self, plan_ctx: &PlanContext, params: &ParamBag) -> Result<Option<Vec<Step>>, TsukuError> {
        let repo = params
            .get_str("repo")
            .ok_or_else(|| TsukuError::invalid_param("github_file", "missing 'repo'"))?;
        let asset_pattern = params
            .get_str("asset_pattern")
            .ok_or_else(|| TsukuError::invalid_param("github_file", "missing 'asset_pattern'"))?;
        let binaries: Vec<String> = params
            .get_str_list("binaries")
            .ok_or_else(|| TsukuError::invalid_param("github_file", "missing 'binaries'"))?
            .into_iter()
            .map(str::to_string)
            .collect();
        let dest = binaries.first().cloned().unwrap_or_else(|| "download".to_string());

        let asset_name = plan_ctx.expansion().expand(asset_pattern);
        let version_tag = &plan_ctx.version_tag;
        let url = format!("https://github.com/{repo}/releases/download/{version_tag}/{asset_name}");

        let mut download = common::download_step(&url, &dest);
        if let Some(pre_downloader) = &plan_ctx.pre_downloader {
            let (sha256, size) = pre_downloader.pre_download(&url).await?;
            download = download.with_checksum(sha256, size);
        }

        Ok(Some(vec![
            download,
            common::chmod_step(&binaries),
            common::install_binaries_step(&binaries, params.get_str("install_mode")),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tsuku_schema::{Arch, Os};

    fn plan_ctx() -> PlanContext {
        PlanContext {
            version: "1.0.0".to_string(),
            version_tag: "1.0.0".to_string(),
            os: Os::Linux,
            arch: Arch::X86_64,
            recipe: Arc::new(crate::recipe::Recipe {
                name: "test".to_string(),
                version_source: crate::recipe::VersionSource::Fixed {
                    version: "1.0.0".to_string(),
                },
                actions: vec![],
                verify: None,
                dependencies: Default::default(),
            }),
            asset_resolver: None,
            pre_downloader: None,
            download_cache: None,
        }
    }

    #[tokio::test]
    async fn builds_download_chmod_install_for_a_raw_asset() {
        let action = GithubFile;
        let params = ParamBag::new()
            .with("repo", "owner/tool")
            .with("asset_pattern", "tool-{version}-{os}-{arch}")
            .with("binaries", vec!["tool".to_string()]);
        let steps = action.decompose(&plan_ctx(), &params).await.unwrap().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].action_name, "download_file");
        assert!(steps[0]
            .params
            .get_str("url")
            .unwrap()
            .ends_with("tool-1.0.0-linux-x86_64"));
    }
}
