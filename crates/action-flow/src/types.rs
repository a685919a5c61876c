//! Core types for plan runs

use std::path::PathBuf;
use std::time::Duration;

use action_primitives::{ActionReport, FailureKind, WaitOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepwright_core_types::{Plan, Step};

/// What happens when a plan uses an action kind with no handler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownActionPolicy {
    /// Log loudly and run the step through the no-op fallback
    #[default]
    Warn,
    /// Refuse to start the run
    Reject,
}

/// Executor settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pause after every dispatch to let the page settle
    pub post_action_delay: Duration,
    /// Recovery decisions allowed per step before it is abandoned
    pub max_recovery_attempts: u32,
    pub unknown_actions: UnknownActionPolicy,
    /// Where screenshots and other artifacts are written
    pub artifacts_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            post_action_delay: Duration::from_secs(1),
            max_recovery_attempts: 3,
            unknown_actions: UnknownActionPolicy::Warn,
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

/// Executor state for the step with the given sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "sequence_number", rename_all = "snake_case")]
pub enum StepState {
    Pending(u32),
    Gated(u32),
    Waiting(u32),
    Dispatching(u32),
    Completed(u32),
    Failed(u32),
    Done,
}

/// How a failed step was brought back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryVia {
    Retry,
    Rebind,
    Replace,
}

/// Final result of one step in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Completed,
    Skipped { reason: String },
    Failed { kind: FailureKind, error: String },
    Recovered { via: RecoveryVia },
}

impl ExecutionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionOutcome::Failed { .. })
    }
}

/// Adaptive wait figures for a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaitSummary {
    pub ready: bool,
    pub measured_ms: u64,
    pub ceiling_ms: u64,
    pub learned: bool,
}

impl From<WaitOutcome> for WaitSummary {
    fn from(outcome: WaitOutcome) -> Self {
        Self {
            ready: outcome.ready,
            measured_ms: outcome.measured.as_millis() as u64,
            ceiling_ms: outcome.ceiling.as_millis() as u64,
            learned: outcome.learned,
        }
    }
}

/// Step execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub sequence_number: u32,
    pub step_id: String,
    pub action_kind: String,
    pub outcome: ExecutionOutcome,

    /// Dispatches made for this step, including failed ones
    pub attempts: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_report: Option<ActionReport>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl StepResult {
    pub fn new(step: &Step, started_at: DateTime<Utc>) -> Self {
        Self {
            sequence_number: step.sequence_number,
            step_id: step.identity.to_string(),
            action_kind: step.action_kind.clone(),
            outcome: ExecutionOutcome::Completed,
            attempts: 0,
            wait: None,
            action_report: None,
            started_at,
            finished_at: started_at,
            latency_ms: 0,
        }
    }

    pub fn with_outcome(mut self, outcome: ExecutionOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_wait(mut self, wait: WaitSummary) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn with_report(mut self, report: ActionReport) -> Self {
        self.action_report = Some(report);
        self
    }

    /// Set finish time and calculate latency
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every eligible step was processed
    Done,
    /// The operator cancelled at a manual checkpoint
    Stopped { sequence_number: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub recovered: usize,
}

/// Result of one pass over a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub plan_id: Option<String>,
    pub plan_label: Option<String>,
    pub start_index: u32,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub steps: Vec<StepResult>,

    /// Executor state transitions, in order
    #[serde(skip)]
    pub transitions: Vec<StepState>,
}

impl RunReport {
    pub fn start(plan: &Plan) -> Self {
        let now = Utc::now();
        Self {
            plan_id: plan.plan_id_str().map(str::to_string),
            plan_label: plan.label.clone(),
            start_index: plan.start_index,
            status: RunStatus::Done,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
            steps: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn record(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    pub fn enter(&mut self, state: StepState) {
        self.transitions.push(state);
    }

    pub fn stop_at(&mut self, sequence_number: u32) {
        self.status = RunStatus::Stopped { sequence_number };
    }

    /// No step ended in an unrecovered failure.
    pub fn success(&self) -> bool {
        !self.steps.iter().any(|step| step.outcome.is_failed())
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for step in &self.steps {
            match step.outcome {
                ExecutionOutcome::Completed => counts.completed += 1,
                ExecutionOutcome::Skipped { .. } => counts.skipped += 1,
                ExecutionOutcome::Failed { .. } => counts.failed += 1,
                ExecutionOutcome::Recovered { .. } => counts.recovered += 1,
            }
        }
        counts
    }

    pub fn outcome_of(&self, sequence_number: u32) -> Option<&ExecutionOutcome> {
        self.steps
            .iter()
            .rev()
            .find(|step| step.sequence_number == sequence_number)
            .map(|step| &step.outcome)
    }

    /// Set finish time and calculate latency
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovered_steps_count_as_success() {
        let plan = Plan::new(vec![Step::new(1, "click"), Step::new(2, "click")]);
        let mut report = RunReport::start(&plan);
        report.record(StepResult::new(&plan.steps[0], Utc::now()).with_outcome(
            ExecutionOutcome::Recovered {
                via: RecoveryVia::Rebind,
            },
        ));
        report.record(StepResult::new(&plan.steps[1], Utc::now()).with_outcome(
            ExecutionOutcome::Skipped {
                reason: "condition 'X' is false".into(),
            },
        ));
        assert!(report.success());
        assert_eq!(
            report.counts(),
            OutcomeCounts {
                completed: 0,
                skipped: 1,
                failed: 0,
                recovered: 1
            }
        );
    }

    #[test]
    fn failed_step_fails_the_run_and_serializes_tagged() {
        let plan = Plan::new(vec![Step::new(4, "click")]);
        let mut report = RunReport::start(&plan);
        report.record(StepResult::new(&plan.steps[0], Utc::now()).with_outcome(
            ExecutionOutcome::Failed {
                kind: FailureKind::Locator,
                error: "Element not found: css:#x".into(),
            },
        ));
        assert!(!report.success());

        let json = serde_json::to_value(&report.steps[0]).unwrap();
        assert_eq!(json["outcome"]["outcome"], "failed");
        assert_eq!(json["outcome"]["kind"], "locator");
    }
}
