//! Shared primitives for the stepwright execution engine
//!
//! Steps, locators, plans and the run-scoped context are defined here so that
//! the gate evaluator, the timing store, the action layer and the executor all
//! speak the same vocabulary without depending on one another.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod context;
pub mod errors;
pub mod input;
pub mod plan;
pub mod step;

pub use context::{RunContext, REQUEST_NUMBER_SLOT};
pub use errors::PlanLoadError;
pub use input::{RawForm, RawPlanDocument, RawStep};
pub use plan::Plan;
pub use step::{GateSpec, Locator, LocatorKind, Step};

/// Stable identity of a step, independent of its sequence number.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity of a plan (one form definition).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
