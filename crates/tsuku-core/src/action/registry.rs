//! The action trait and the name -> instance registry.
//!
//! Grounded on the teacher's `ops::install::Installer` trait (one capability
//! interface, several concrete implementations, dispatched by a match on a
//! task kind) -- generalized here to a name-keyed registry per spec.md §4.5,
//! since the action set is data-driven (recipe-specified) rather than a
//! fixed enum of install strategies.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use super::context::{ExecutionContext, PlanContext};
use super::step::Step;
use crate::deps::ActionDeps;
use crate::error::{PreflightResult, TsukuError};

/// The closed set of terminal, directly-executing operations, per spec.md
/// §3. Anything not in this list is either a composite (decomposable) or
/// unknown.
pub const PRIMITIVE_NAMES: &[&str] = &[
    "download_file",
    "extract",
    "chmod",
    "install_binaries",
    "install_libraries",
    "set_env",
    "set_rpath",
    "link_dependencies",
    "apply_patch_file",
    "text_replace",
    "homebrew_relocate",
    "cargo_build",
    "cmake_build",
    "configure_make",
    "cpan_install",
    "gem_exec",
    "go_build",
    "install_gem_direct",
    "meson_build",
    "nix_realize",
    "npm_exec",
    "pip_exec",
    "pip_install",
    "setup_build_env",
];

/// `IsPrimitive(name)`: closed membership test against [`PRIMITIVE_NAMES`].
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVE_NAMES.contains(&name)
}

/// A named operation: primitive (executes directly) or composite
/// (decomposes into a list of [`Step`]s at plan time).
#[async_trait]
pub trait Action: Send + Sync {
    /// This action's registered name.
    fn name(&self) -> &'static str;

    /// Validate `params` before any side effect occurs. Errors abort plan
    /// execution; warnings are merely reported.
    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let _ = params;
        PreflightResult::ok()
    }

    /// Execute this action under `ctx`. Only called for primitive actions.
    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError>;

    /// Expand this action into a list of (possibly still-composite) steps.
    /// `None` means this action is a primitive and has no decomposition.
    async fn decompose(
        &self,
        _plan_ctx: &PlanContext,
        _params: &ParamBag,
    ) -> Result<Option<Vec<Step>>, TsukuError> {
        Ok(None)
    }

    /// Declared install-time/runtime dependencies for this action.
    fn dependencies(&self) -> ActionDeps {
        crate::deps::action_deps(self.name())
    }

    /// Whether this action performs network I/O (at plan time, execute
    /// time, or both).
    fn requires_network(&self) -> bool {
        false
    }

    /// Whether this action's output is a pure function of its params (no
    /// wall-clock/network-dependent variation once params are fixed).
    fn is_deterministic(&self) -> bool {
        true
    }
}

/// The process-wide name -> action instance map. Actions are stateless and
/// registered once at startup, per spec.md §3's lifecycle note.
#[derive(Default)]
pub struct Registry {
    actions: BTreeMap<&'static str, Arc<dyn Action>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under its own `name()`.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name(), action);
    }

    /// Look up a registered action by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Action>> {
        self.actions.get(name)
    }

    /// `IsDecomposable(name)`: true iff a registered action under `name`
    /// exists (decomposability itself is determined by calling `decompose`
    /// and checking for `Some`, since the trait gives every action a
    /// default no-op decomposition).
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Build a registry with every primitive and composite action this
    /// crate implements.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::action::primitives::register_all(&mut registry);
        crate::action::composite::register_all(&mut registry);
        registry
    }
}
