//! Plan-time decomposition, exercised through the public `decompose`/
//! `Registry` API: every registered composite bottoms out in primitives
//! only, and decomposing the same recipe twice yields an identical plan.

use std::sync::Arc;

use tsuku_core::action::context::PlanContext;
use tsuku_core::action::registry::{is_primitive, Registry, PRIMITIVE_NAMES};
use tsuku_core::action::{decompose, Plan};
use tsuku_core::recipe::{Recipe, VersionSource};
use tsuku_schema::{Arch, Os, ParamBag};

const COMPOSITE_NAMES: &[&str] = &[
    "download",
    "download_archive",
    "github_archive",
    "github_file",
    "homebrew_bottle",
    "nix_install",
];

fn plan_ctx(recipe_name: &str) -> PlanContext {
    PlanContext {
        version: "14.1.0".to_string(),
        version_tag: "14.1.0".to_string(),
        os: Os::Linux,
        arch: Arch::X86_64,
        recipe: Arc::new(Recipe {
            name: recipe_name.to_string(),
            version_source: VersionSource::Fixed {
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

fn ripgrep_params() -> ParamBag {
    ParamBag::new()
        .with("repo", "BurntSushi/ripgrep")
        .with("asset_pattern", "ripgrep-{version}-{arch}-unknown-linux-musl.tar.gz")
        .with("strip_dirs", 1_i64)
        .with("binaries", vec!["rg".to_string()])
}

#[test]
fn every_primitive_and_composite_name_is_registered() {
    let registry = Registry::with_defaults();
    for name in PRIMITIVE_NAMES {
        assert!(registry.contains(name), "primitive '{name}' is not registered");
    }
    for name in COMPOSITE_NAMES {
        assert!(registry.contains(name), "composite '{name}' is not registered");
    }
}

#[tokio::test]
async fn github_archive_decomposes_to_primitives_only() {
    let registry = Registry::with_defaults();
    let ctx = plan_ctx("ripgrep");
    let plan = decompose(&registry, &ctx, "github_archive", &ripgrep_params(), None)
        .await
        .unwrap();

    assert!(!plan.steps.is_empty());
    for step in &plan.steps {
        assert!(
            is_primitive(&step.action_name),
            "step '{}' is not a primitive",
            step.action_name
        );
    }
}

fn steps_fingerprint(plan: &Plan) -> Vec<(String, String, Option<String>, Option<u64>)> {
    plan.steps
        .iter()
        .map(|s| (s.action_name.clone(), s.params.canonical_json(), s.checksum.clone(), s.size))
        .collect()
}

#[tokio::test]
async fn decomposing_the_same_recipe_twice_is_idempotent() {
    let registry = Registry::with_defaults();
    let ctx = plan_ctx("ripgrep");
    let params = ripgrep_params();

    let first = decompose(&registry, &ctx, "github_archive", &params, None).await.unwrap();
    let second = decompose(&registry, &ctx, "github_archive", &params, None).await.unwrap();

    assert_eq!(steps_fingerprint(&first), steps_fingerprint(&second));
}

#[tokio::test]
async fn unknown_action_name_is_rejected() {
    let registry = Registry::with_defaults();
    let ctx = plan_ctx("ripgrep");
    let err = decompose(&registry, &ctx, "not_a_real_action", &ParamBag::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, tsuku_core::TsukuError::InvalidParam(_)));
}
