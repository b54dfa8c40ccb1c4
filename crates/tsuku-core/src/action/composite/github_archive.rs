//! `github_archive`: fetch a release asset from a GitHub repo, extract
//! it, then install the listed binaries, per spec.md §4.5's worked
//! example (`github_archive` of ripgrep).

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::common;
use crate::action::context::{ExecutionContext, PlanContext};
use crate::action::registry::Action;
use crate::action::step::Step;
use crate::error::{PreflightResult, TsukuError};

/// `github_archive`. Params: `repo` (`owner/name`), `asset_pattern`
/// (`{version}`/`{arch}`/`{os}`-templated), `strip_dirs`, `binaries[]`,
/// optional `install_mode`.
pub struct GithubArchive;

#[async_trait]
impl Action for GithubArchive {
    fn name(&self) -> &'static str {
        "github_archive"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("repo").is_none() {
            result.error("github_archive requires a 'repo' param");
        }
        if params.get_str("asset_pattern").is_none() {
            result.error("github_archive requires an 'asset_pattern' param");
        }
        if params.get_str_list("binaries").is_none() {
            result.error("github_archive requires a 'binaries' list of strings");
        }
        result
    }

    async fn execute(&self, _ctx: &ExecutionContext, _params: &ParamBag) -> Result<(), TsukuError> {
        unreachable!("github_archive is a composite action; it must be decomposed before execution")
    }

    async fn decompose(&self, plan_ctx: &PlanContext, params: &ParamBag) -> Result<Option<Vec<Step>>, TsukuError> {
        let repo = params
            .get_str("repo")
            .ok_or_else(|| TsukuError::invalid_param("github_archive", "missing 'repo'"))?;
        let asset_pattern = params
            .get_str("asset_pattern")
            .ok_or_else(|| TsukuError::invalid_param("github_archive", "missing 'asset_pattern'"))?;
        let binaries: Vec<String> = params
            .get_str_list("binaries")
            .ok_or_else(|| TsukuError::invalid_param("github_archive", "missing 'binaries'"))?
            .into_iter()
            .map(str::to_string)
            .collect();

        let asset_name = plan_ctx.expansion().expand(asset_pattern);
        let version_tag = &plan_ctx.version_tag;
        let url = format!("https://github.com/{repo}/releases/download/{version_tag}/{asset_name}");

        let format = common::format_for_filename(&asset_name).map(str::to_string);
        let strip_dirs = params.get_int("strip_dirs");

        let mut download = common::download_step(&url, &asset_name);
        if let Some(pre_downloader) = &plan_ctx.pre_downloader {
            let (sha256, size) = pre_downloader.pre_download(&url).await?;
            download = download.with_checksum(sha256, size);
        }

        Ok(Some(vec![
            download,
            common::extract_step(&asset_name, format.as_deref(), strip_dirs),
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
            version: "14.1.0".to_string(),
            version_tag: "14.1.0".to_string(),
            os: Os::Linux,
            arch: Arch::X86_64,
            recipe: Arc::new(crate::recipe::Recipe {
                name: "ripgrep".to_string(),
                version_source: crate::recipe::VersionSource::Fixed {
                    version: "14.1.0".to_string(),
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
    async fn matches_the_ripgrep_worked_example() {
        let action = GithubArchive;
        let params = ParamBag::new()
            .with("repo", "BurntSushi/ripgrep")
            .with("asset_pattern", "ripgrep-{version}-{arch}-unknown-linux-musl.tar.gz")
            .with("strip_dirs", 1_i64)
            .with("binaries", vec!["rg".to_string()]);

        let steps = action.decompose(&plan_ctx(), &params).await.unwrap().unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(
            steps[0].params.get_str("url"),
            Some("https://github.com/BurntSushi/ripgrep/releases/download/14.1.0/ripgrep-14.1.0-x86_64-unknown-linux-musl.tar.gz")
        );
        assert_eq!(steps[1].action_name, "extract");
        assert_eq!(steps[1].params.get_str("format"), Some("tar.gz"));
        assert_eq!(steps[1].params.get_int("strip_dirs"), Some(1));
        assert_eq!(steps[2].action_name, "chmod");
        assert_eq!(steps[3].action_name, "install_binaries");
    }
}
