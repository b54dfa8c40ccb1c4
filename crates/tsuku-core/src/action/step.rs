//! `Step` and `Plan`: the flat, primitive-only output of decomposition.

use serde::{Deserialize, Serialize};
use tsuku_schema::ParamBag;

/// One primitive operation in a plan, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// The primitive's registered name.
    pub action_name: String,
    /// Parameters for this step, already variable-expanded.
    pub params: ParamBag,
    /// Checksum to verify against, if this step (or the composite it was
    /// decomposed from) carries one.
    #[serde(default)]
    pub checksum: Option<String>,
    /// Size in bytes, propagated alongside `checksum` when known.
    #[serde(default)]
    pub size: Option<u64>,
}

impl Step {
    /// Construct a step with no checksum/size set.
    pub fn new(action_name: impl Into<String>, params: ParamBag) -> Self {
        Self {
            action_name: action_name.into(),
            params,
            checksum: None,
            size: None,
        }
    }

    /// Attach a checksum and size, builder-style.
    pub fn with_checksum(mut self, checksum: impl Into<String>, size: u64) -> Self {
        self.checksum = Some(checksum.into());
        self.size = Some(size);
        self
    }
}

/// An ordered, flattened sequence of primitive [`Step`]s, ready to execute.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Plan {
    /// The steps to run, in order.
    pub steps: Vec<Step>,
}

impl Plan {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Append all of another plan's steps, in order.
    pub fn extend(&mut self, other: Plan) {
        self.steps.extend(other.steps);
    }
}
