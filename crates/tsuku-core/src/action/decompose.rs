//! Recursive composite-to-primitive decomposition with cycle detection.
//!
//! Grounded on the teacher's `core::resolver::resolve_recursive`
//! (visiting/visited sets, `bail!` on revisit) -- generalized per spec.md
//! §4.5 from package-name cycles to `(action, canonical_json(params))`
//! fingerprints, since the same composite name can legitimately recur with
//! different params (e.g. two `download_file` steps for different URLs).

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tsuku_schema::ParamBag;

use super::context::PlanContext;
use super::registry::Registry;
use super::step::{Plan, Step};
use crate::error::TsukuError;

fn visit_key(action_name: &str, params: &ParamBag) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action_name.as_bytes());
    hasher.update(params.canonical_json().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

/// Recursively decompose `action_name(params)` into a flat [`Plan`] of
/// primitive steps, per spec.md §4.5. A composite that expands to exactly
/// one primitive step copies its own checksum/size onto that step, if set.
pub async fn decompose(
    registry: &Registry,
    plan_ctx: &PlanContext,
    action_name: &str,
    params: &ParamBag,
    checksum: Option<(&str, u64)>,
) -> Result<Plan, TsukuError> {
    let mut visited = HashSet::new();
    decompose_inner(registry, plan_ctx, action_name, params, checksum, &mut visited).await
}

#[async_recursion::async_recursion]
async fn decompose_inner(
    registry: &Registry,
    plan_ctx: &PlanContext,
    action_name: &str,
    params: &ParamBag,
    checksum: Option<(&str, u64)>,
    visited: &mut HashSet<String>,
) -> Result<Plan, TsukuError> {
    let key = visit_key(action_name, params);
    if !visited.insert(key) {
        return Err(TsukuError::Cycle {
            action: action_name.to_string(),
        });
    }

    let action = registry.get(action_name).ok_or_else(|| {
        TsukuError::invalid_param("action_name", format!("unknown action '{action_name}'"))
    })?;

    if super::registry::is_primitive(action_name) {
        let mut step = Step::new(action_name, params.clone());
        if let Some((hash, size)) = checksum {
            step = step.with_checksum(hash, size);
            if !step.params.contains("checksum") {
                step.params.set("checksum", hash);
                step.params.set("checksum_algo", "sha256");
            }
        }
        let mut plan = Plan::new();
        plan.push(step);
        return Ok(plan);
    }

    let children = action
        .decompose(plan_ctx, params)
        .await?
        .ok_or_else(|| TsukuError::invalid_param("action_name", format!("'{action_name}' is neither a primitive nor decomposable")))?;

    let mut plan = Plan::new();
    let single_child = children.len() == 1;
    for child in children {
        let child_checksum = if single_child {
            checksum
        } else {
            child.checksum.as_deref().zip(child.size)
        };
        let sub_plan = decompose_inner(
            registry,
            plan_ctx,
            &child.action_name,
            &child.params,
            child_checksum,
            visited,
        )
        .await?;
        plan.extend(sub_plan);
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::registry::Action;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tsuku_schema::{Arch, Os, Value};

    struct Passthrough;

    #[async_trait]
    impl Action for Passthrough {
        fn name(&self) -> &'static str {
            "download_file"
        }
        async fn execute(
            &self,
            _ctx: &crate::action::context::ExecutionContext,
            _params: &ParamBag,
        ) -> Result<(), TsukuError> {
            Ok(())
        }
    }

    struct SelfReferential;

    #[async_trait]
    impl Action for SelfReferential {
        fn name(&self) -> &'static str {
            "loopy"
        }
        async fn execute(
            &self,
            _ctx: &crate::action::context::ExecutionContext,
            _params: &ParamBag,
        ) -> Result<(), TsukuError> {
            Ok(())
        }
        async fn decompose(
            &self,
            _plan_ctx: &PlanContext,
            params: &ParamBag,
        ) -> Result<Option<Vec<Step>>, TsukuError> {
            Ok(Some(vec![Step::new("loopy", params.clone())]))
        }
    }

    fn plan_ctx() -> PlanContext {
        PlanContext {
            version: "1.0.0".to_string(),
            version_tag: "v1.0.0".to_string(),
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
    async fn primitive_decomposes_to_a_single_step() {
        let mut registry = Registry::new();
        registry.register(Arc::new(Passthrough));

        let params = ParamBag::new().with("url", Value::String("https://x".to_string()));
        let plan = decompose(&registry, &plan_ctx(), "download_file", &params, None)
            .await
            .unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action_name, "download_file");
    }

    #[tokio::test]
    async fn self_referential_composite_is_a_cycle_error() {
        let mut registry = Registry::new();
        registry.register(Arc::new(SelfReferential));

        let err = decompose(&registry, &plan_ctx(), "loopy", &ParamBag::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TsukuError::Cycle { .. }));
    }
}
