//! Collaborator ports for operator decisions
//!
//! The executor calls out through these traits and blocks on the answer; the
//! browser session stays open and idle meanwhile. Implementations may prompt
//! on a console, apply a fixed policy, or forward to another process.

use action_primitives::{ManualActionPort, ManualDecision, ManualRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepwright_core_types::{Locator, Plan, Step};
use tracing::info;

use crate::recovery::{FailureContext, RecoveryDecision};
use crate::types::RunReport;

/// Decides what to do about a failed step.
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn decide(&self, failure: &FailureContext<'_>) -> RecoveryDecision;
}

/// Supplies a fresh locator for a step whose element drifted.
#[async_trait]
pub trait ElementPicker: Send + Sync {
    /// `None` when the operator gives up.
    async fn pick_locator(&self, step: &Step) -> Option<Locator>;
}

/// Authors a step to replace a failing one.
#[async_trait]
pub trait StepAuthor: Send + Sync {
    /// `None` when the operator gives up. The sequence number of the returned
    /// step is ignored; the replacement takes the failing step's place.
    async fn author_step(&self, plan: &Plan, replacing: &Step) -> Option<Step>;
}

/// What to do after a run completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", content = "sequence_number", rename_all = "kebab-case")]
pub enum ContinuationChoice {
    Stop,
    FromBeginning,
    FromHere(u32),
}

#[async_trait]
pub trait ContinuationPort: Send + Sync {
    async fn next_run(&self, report: &RunReport) -> ContinuationChoice;
}

/// Unattended operator: abandons failed steps, declines manual checkpoints
/// and stops after one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractivePolicy;

#[async_trait]
impl FailureHandler for NonInteractivePolicy {
    async fn decide(&self, failure: &FailureContext<'_>) -> RecoveryDecision {
        info!(
            sequence_number = failure.step.sequence_number,
            "non-interactive run; abandoning failed step"
        );
        RecoveryDecision::Abandon
    }
}

#[async_trait]
impl ElementPicker for NonInteractivePolicy {
    async fn pick_locator(&self, _step: &Step) -> Option<Locator> {
        None
    }
}

#[async_trait]
impl StepAuthor for NonInteractivePolicy {
    async fn author_step(&self, _plan: &Plan, _replacing: &Step) -> Option<Step> {
        None
    }
}

#[async_trait]
impl ContinuationPort for NonInteractivePolicy {
    async fn next_run(&self, _report: &RunReport) -> ContinuationChoice {
        ContinuationChoice::Stop
    }
}

#[async_trait]
impl ManualActionPort for NonInteractivePolicy {
    async fn confirm(&self, request: ManualRequest<'_>) -> ManualDecision {
        info!(
            sequence_number = request.step.sequence_number,
            "non-interactive run; declining manual checkpoint"
        );
        ManualDecision::Cancel
    }
}
