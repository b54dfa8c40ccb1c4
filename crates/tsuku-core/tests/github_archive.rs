//! `github_archive` decomposition against a mocked release host: the
//! checksum a `PreDownloader` captures at plan time ends up both on the
//! emitted step's `checksum` field and, per `download_file`'s own
//! verification, inside that step's params.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tsuku_core::action::context::{PlanContext, PreDownloader};
use tsuku_core::action::registry::Registry;
use tsuku_core::action::decompose;
use tsuku_core::download::DownloadError;
use tsuku_core::recipe::{Recipe, VersionSource};
use tsuku_schema::{Arch, Os, ParamBag};

/// Stands in for a real plan-time fetcher: rewrites whatever `https://
/// github.com/...` URL `GithubArchive` builds onto a local mock server
/// before fetching, so the real host is never touched.
struct MockPreDownloader {
    client: reqwest::Client,
    mock_base: String,
}

#[async_trait]
impl PreDownloader for MockPreDownloader {
    async fn pre_download(&self, url: &str) -> Result<(String, u64), DownloadError> {
        let path = url.strip_prefix("https://github.com").unwrap_or(url);
        let mocked_url = format!("{}{path}", self.mock_base);
        let bytes = self.client.get(&mocked_url).send().await?.bytes().await?;
        let sha256 = hex::encode(Sha256::digest(&bytes));
        Ok((sha256, bytes.len() as u64))
    }
}

fn ripgrep_params() -> ParamBag {
    ParamBag::new()
        .with("repo", "BurntSushi/ripgrep")
        .with("asset_pattern", "ripgrep-{version}-{arch}-unknown-linux-musl.tar.gz")
        .with("strip_dirs", 1_i64)
        .with("binaries", vec!["rg".to_string()])
}

fn plan_ctx(pre_downloader: Option<Arc<dyn PreDownloader>>) -> PlanContext {
    PlanContext {
        version: "14.1.0".to_string(),
        version_tag: "14.1.0".to_string(),
        os: Os::Linux,
        arch: Arch::X86_64,
        recipe: Arc::new(Recipe {
            name: "ripgrep".to_string(),
            version_source: VersionSource::Fixed {
                version: "14.1.0".to_string(),
            },
            actions: vec![],
            verify: None,
            dependencies: Default::default(),
        }),
        asset_resolver: None,
        pre_downloader,
        download_cache: None,
    }
}

#[tokio::test]
async fn plan_shape_matches_the_ripgrep_worked_example() {
    let registry = Registry::with_defaults();
    let plan = decompose(&registry, &plan_ctx(None), "github_archive", &ripgrep_params(), None)
        .await
        .unwrap();

    assert_eq!(plan.steps.len(), 4);
    assert_eq!(plan.steps[0].action_name, "download_file");
    assert_eq!(
        plan.steps[0].params.get_str("url"),
        Some("https://github.com/BurntSushi/ripgrep/releases/download/14.1.0/ripgrep-14.1.0-x86_64-unknown-linux-musl.tar.gz")
    );
    assert_eq!(plan.steps[1].action_name, "extract");
    assert_eq!(plan.steps[1].params.get_str("format"), Some("tar.gz"));
    assert_eq!(plan.steps[2].action_name, "chmod");
    assert_eq!(plan.steps[3].action_name, "install_binaries");
}

#[tokio::test]
async fn a_plan_time_checksum_from_a_mocked_host_lands_in_the_download_steps_own_params() {
    // The asset URL `GithubArchive` builds always points at github.com;
    // `MockPreDownloader` rewrites it onto this local mock server instead
    // of ever touching the real host.
    let mut server = mockito::Server::new_async().await;
    let body = b"a stand-in release archive's bytes";
    let mock = server
        .mock(
            "GET",
            "/BurntSushi/ripgrep/releases/download/14.1.0/ripgrep-14.1.0-x86_64-unknown-linux-musl.tar.gz",
        )
        .with_status(200)
        .with_body(&body[..])
        .create_async()
        .await;
    let expected_sha256 = hex::encode(Sha256::digest(&body[..]));

    let pre_downloader = MockPreDownloader {
        client: reqwest::Client::new(),
        mock_base: server.url(),
    };

    // Now drive the real `decompose()` path with a pre-downloader wired in,
    // confirming the checksum it captures propagates all the way into the
    // finalized `download_file` step's own params (not just `Step.checksum`),
    // since that's what `download_file::execute` actually reads at run time.
    let registry = Registry::with_defaults();
    let ctx = plan_ctx(Some(Arc::new(pre_downloader)));
    let plan = decompose(&registry, &ctx, "github_archive", &ripgrep_params(), None)
        .await
        .unwrap();

    let download_step = &plan.steps[0];
    assert_eq!(download_step.action_name, "download_file");
    assert_eq!(download_step.checksum.as_deref(), Some(expected_sha256.as_str()));
    assert_eq!(download_step.params.get_str("checksum"), Some(expected_sha256.as_str()));
    assert_eq!(download_step.params.get_str("checksum_algo"), Some("sha256"));
    mock.assert_async().await;
}
