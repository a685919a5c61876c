//! Core data types for action handlers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepwright_core_types::Step;

/// Non-error result of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Completed,
    /// The operator declined to continue at a manual checkpoint.
    UserCancelled,
}

/// Report produced by one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub action_kind: String,
    pub outcome: ActionOutcome,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
    /// Set when the step was routed to the fallback handler
    pub fallback: bool,
}

impl ActionReport {
    pub fn new(action_kind: impl Into<String>, outcome: ActionOutcome, started_at: DateTime<Utc>) -> Self {
        Self {
            action_kind: action_kind.into(),
            outcome,
            started_at,
            latency_ms: 0,
            fallback: false,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Operator answer to a manual checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualDecision {
    Continue,
    Cancel,
}

/// What the operator is asked to do at a manual checkpoint.
#[derive(Debug, Clone)]
pub struct ManualRequest<'a> {
    pub step: &'a Step,
    pub instructions: &'a str,
    /// Items the operator must confirm before continuing; may be empty.
    pub checklist: &'a [&'a str],
}

/// Blocks on an operator decision while the browser stays idle.
#[async_trait]
pub trait ManualActionPort: Send + Sync {
    async fn confirm(&self, request: ManualRequest<'_>) -> ManualDecision;
}
