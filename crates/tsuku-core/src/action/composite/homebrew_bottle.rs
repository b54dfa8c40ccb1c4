//! `homebrew_bottle`: fetch a Homebrew bottle tarball from GHCR (an
//! anonymous token exchange followed by an OCI manifest-index lookup),
//! extract it, relocate its `@@HOMEBREW_PREFIX@@` placeholders, then
//! install the listed binaries, per spec.md §4.5.
//!
//! Grounded on the teacher's `indexer::import::homebrew` (a `reqwest`
//! client built per call, `serde::Deserialize` structs over the upstream
//! JSON shape), generalized from the Homebrew formula JSON API to GHCR's
//! OCI registry protocol since this composite fetches the bottle itself
//! rather than formula metadata.

use async_trait::async_trait;
use serde::Deserialize;
use tsuku_schema::{Arch, Os, ParamBag};

use super::common;
use crate::action::context::{ExecutionContext, PlanContext};
use crate::action::registry::Action;
use crate::action::step::Step;
use crate::error::TsukuError;
use crate::error::PreflightResult;

const GHCR_REGISTRY: &str = "ghcr.io";
const HOMEBREW_TAP_REPO: &str = "homebrew/core";

#[derive(Debug, Deserialize)]
struct GhcrToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct OciIndex {
    manifests: Vec<OciManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct OciManifestEntry {
    digest: String,
    #[serde(default)]
    platform: Option<OciPlatform>,
    #[serde(default)]
    annotations: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OciPlatform {
    architecture: String,
    os: String,
}

/// `homebrew_bottle`. Params: `formula`, optional `tap` (default
/// `homebrew/core`), `binaries[]`, optional `install_mode`.
pub struct HomebrewBottle;

#[async_trait]
impl Action for HomebrewBottle {
    fn name(&self) -> &'static str {
        "homebrew_bottle"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("formula").is_none() {
            result.error("homebrew_bottle requires a 'formula' param");
        }
        if params.get_str_list("binaries").is_none() {
            result.error("homebrew_bottle requires a 'binaries' list of strings");
        }
        result
    }

    async fn execute(&self, _ctx: &ExecutionContext, _params: &ParamBag) -> Result<(), TsukuError> {
        unreachable!("homebrew_bottle is a composite action; it must be decomposed before execution")
    }

    async fn decompose(&self, plan_ctx: &PlanContext, params: &ParamBag) -> Result<Option<Vec<Step>>, TsukuError> {
        let formula = params
            .get_str("formula")
            .ok_or_else(|| TsukuError::invalid_param("homebrew_bottle", "missing 'formula'"))?;
        let tap = params.str_or("tap", HOMEBREW_TAP_REPO);
        let binaries: Vec<String> = params
            .get_str_list("binaries")
            .ok_or_else(|| TsukuError::invalid_param("homebrew_bottle", "missing 'binaries'"))?
            .into_iter()
            .map(str::to_string)
            .collect();

        let digest = resolve_bottle_digest(tap, formula, &plan_ctx.version, plan_ctx.os, plan_ctx.arch)
            .await
            .map_err(|e| TsukuError::invalid_param("homebrew_bottle", e))?;

        let blob_url = format!("https://{GHCR_REGISTRY}/v2/{tap}/{formula}/blobs/{digest}");
        let dest_name = format!("{formula}-{}.bottle.tar.gz", plan_ctx.version);

        let download = common::download_step(&blob_url, &dest_name);

        Ok(Some(vec![
            download,
            common::extract_step(&dest_name, Some("tar.gz"), None),
            Step::new("homebrew_relocate", ParamBag::new().with("dir", ".")),
            common::chmod_step(&binaries),
            common::install_binaries_step(&binaries, params.get_str("install_mode")),
        ]))
    }
}

/// Anonymous GHCR token exchange followed by an OCI image-index lookup,
/// per spec.md §4.5's "homebrew_bottle decomposes analogously, querying
/// GHCR's anonymous token + OCI manifest index" note.
async fn resolve_bottle_digest(tap: &str, formula: &str, version: &str, os: Os, arch: Arch) -> Result<String, String> {
    let client = reqwest::Client::new();

    let token_url =
        format!("https://{GHCR_REGISTRY}/token?scope=repository:{tap}/{formula}:pull&service={GHCR_REGISTRY}");
    let token: GhcrToken = client
        .get(&token_url)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;

    let manifest_url = format!("https://{GHCR_REGISTRY}/v2/{tap}/{formula}/manifests/{version}");
    let index: OciIndex = client
        .get(&manifest_url)
        .bearer_auth(&token.token)
        .header("Accept", "application/vnd.oci.image.index.v1+json")
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;

    index
        .manifests
        .iter()
        .find(|m| {
            m.platform.as_ref().is_some_and(|p| platform_struct_matches(os, arch, p))
                || m.annotations
                    .get("org.opencontainers.image.ref.name")
                    .is_some_and(|tag| platform_tag_matches(os, arch, tag))
        })
        .map(|m| m.digest.clone())
        .ok_or_else(|| format!("no bottle manifest found for {os:?}/{arch:?}"))
}

/// OCI-standard `platform.architecture`/`platform.os` match, per the
/// manifest-index spec (`amd64`/`arm64` archs, `linux`/`darwin` OSes).
fn platform_struct_matches(os: Os, arch: Arch, platform: &OciPlatform) -> bool {
    let arch_ok = match arch {
        Arch::X86_64 => matches!(platform.architecture.as_str(), "amd64" | "x86_64"),
        Arch::Arm64 => matches!(platform.architecture.as_str(), "arm64" | "aarch64"),
    };
    let os_ok = match os {
        Os::Linux => platform.os == "linux",
        Os::Macos => platform.os == "darwin",
    };
    arch_ok && os_ok
}

/// Whether a GHCR platform tag (from the manifest's `platform` struct, or
/// its `org.opencontainers.image.ref.name` annotation) denotes `os`/`arch`.
///
/// Linux bottle tags are architecture-only: `x86_64_linux`/`arm64_linux`.
/// macOS bottle tags are codename-based instead (`arm64_sonoma`,
/// `monterey`, ...), with the arch prefix omitted entirely for the
/// historical x86_64-only releases, so an exact arch+OS tag can't be
/// constructed without also knowing the macOS version. Matching instead
/// checks the arch prefix (when present) and excludes `_linux` tags for
/// macOS, since those two tag families never overlap in practice.
fn platform_tag_matches(os: Os, arch: Arch, tag: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    match os {
        Os::Linux => {
            let arch_prefix = match arch {
                Arch::X86_64 => "x86_64",
                Arch::Arm64 => "arm64",
            };
            tag == format!("{arch_prefix}_linux")
        }
        Os::Macos => {
            if tag.ends_with("_linux") {
                false
            } else if tag.starts_with("arm64_") {
                arch == Arch::Arm64
            } else if tag.starts_with("x86_64_") {
                arch == Arch::X86_64
            } else {
                // Bare codename (no arch prefix): the historical
                // x86_64-only bottle naming, from before Apple Silicon.
                arch == Arch::X86_64
            }
        }
    }
}
