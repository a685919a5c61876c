//! Step executor
//!
//! Processes one step at a time in ascending sequence order, starting at the
//! plan's start index:
//!
//! ```text
//! Pending -> Gated                                  (condition false: Skipped)
//! Pending -> Waiting -> Dispatching -> Completed
//!                                   -> Failed -> recovery -> Pending (same or new step)
//!                                                         -> abandoned (Failed)
//! ... -> Done
//! ```
//!
//! Open JavaScript dialogs are dismissed before and after every dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use action_gate::{GateEvaluator, GateVerdict};
use action_primitives::{
    dismiss_interruptions, ActionCtx, ActionOutcome, AdaptiveWaiter, BrowserDriver, DispatchTable,
    LocatorProbe, ManualActionPort, WaitTarget,
};
use chrono::Utc;
use stepwright_core_types::{Plan, StepId};
use tracing::{debug, error, info, warn};

use crate::{
    errors::FlowError,
    recovery::{FailureContext, RecoveryAction, RecoveryCoordinator},
    types::{
        ExecutionOutcome, RecoveryVia, RunOptions, RunReport, StepResult, StepState,
        UnknownActionPolicy,
    },
};

pub struct StepExecutor {
    driver: Arc<dyn BrowserDriver>,
    gate: GateEvaluator,
    waiter: AdaptiveWaiter,
    dispatch: Arc<DispatchTable>,
    recovery: RecoveryCoordinator,
    manual: Option<Arc<dyn ManualActionPort>>,
    options: RunOptions,
}

impl StepExecutor {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        gate: GateEvaluator,
        waiter: AdaptiveWaiter,
        dispatch: Arc<DispatchTable>,
        recovery: RecoveryCoordinator,
    ) -> Self {
        Self {
            driver,
            gate,
            waiter,
            dispatch,
            recovery,
            manual: None,
            options: RunOptions::default(),
        }
    }

    pub fn with_manual(mut self, manual: Arc<dyn ManualActionPort>) -> Self {
        self.manual = Some(manual);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn recovery(&self) -> &RecoveryCoordinator {
        &self.recovery
    }

    /// Check every action kind in `plan` against the dispatch table.
    pub fn check_actions(&self, plan: &Plan) -> Result<(), FlowError> {
        let unknown = self.dispatch.unknown_actions(plan);
        if unknown.is_empty() {
            return Ok(());
        }
        for action in &unknown {
            warn!(
                sequence_number = action.sequence_number,
                action_kind = %action.action_kind,
                "plan step uses an action with no handler; it will run as a no-op"
            );
        }
        match self.options.unknown_actions {
            UnknownActionPolicy::Warn => Ok(()),
            UnknownActionPolicy::Reject => Err(FlowError::UnknownActions(unknown)),
        }
    }

    /// Run `plan` from its start index to the end.
    ///
    /// Step failures never abort the run; they are resolved through recovery
    /// and recorded in the report. Errors are returned only for plan-level
    /// problems.
    pub async fn run(&self, plan: &mut Plan) -> Result<RunReport, FlowError> {
        self.check_actions(plan)?;

        let mut report = RunReport::start(plan);
        let mut failures: HashMap<StepId, u32> = HashMap::new();
        let mut recovered: HashMap<StepId, RecoveryVia> = HashMap::new();
        let mut cursor = plan.eligible_steps().next().map(|step| step.sequence_number);

        info!(
            plan_id = plan.plan_id_str().unwrap_or("-"),
            start_index = plan.start_index,
            steps = plan.steps.len(),
            "starting plan run"
        );

        while let Some(sequence_number) = cursor {
            let Some(step) = plan.find_by_sequence(sequence_number).cloned() else {
                cursor = plan.next_sequence_after(sequence_number);
                continue;
            };
            report.enter(StepState::Pending(sequence_number));
            let started_at = Utc::now();

            let verdict = self.gate.check(&step.condition, &plan.run_context);
            if let Some(reason) = verdict.reason() {
                report.enter(StepState::Gated(sequence_number));
                if matches!(verdict, GateVerdict::Failed { .. }) {
                    warn!(
                        sequence_number,
                        step_id = %step.identity,
                        reason = %reason,
                        "condition could not be evaluated; step skipped"
                    );
                } else {
                    info!(
                        sequence_number,
                        step_id = %step.identity,
                        reason = %reason,
                        "step skipped"
                    );
                }
                report.record(
                    StepResult::new(&step, started_at)
                        .with_outcome(ExecutionOutcome::Skipped { reason })
                        .finish(),
                );
                cursor = plan.next_sequence_after(sequence_number);
                continue;
            }

            dismiss_interruptions(self.driver.as_ref(), sequence_number).await;

            report.enter(StepState::Waiting(sequence_number));
            let probe = LocatorProbe::new(self.driver.as_ref(), &step.locator);
            let wait = self
                .waiter
                .await_step(
                    &probe,
                    WaitTarget {
                        step_id: step.identity.as_str(),
                        action_kind: &step.action_kind,
                        plan_id: plan.plan_id_str(),
                        plan_label: plan.label.as_deref(),
                    },
                )
                .await;
            if !wait.ready {
                debug!(
                    sequence_number,
                    ceiling_ms = wait.ceiling.as_millis() as u64,
                    "element not ready within ceiling; dispatching anyway"
                );
            }

            report.enter(StepState::Dispatching(sequence_number));
            let result = {
                let mut ctx = ActionCtx::new(
                    self.driver.as_ref(),
                    &step,
                    &mut plan.run_context,
                    &self.options.artifacts_dir,
                )
                .with_manual(self.manual.as_deref());
                self.dispatch.dispatch(&mut ctx).await
            };

            dismiss_interruptions(self.driver.as_ref(), sequence_number).await;
            if !self.options.post_action_delay.is_zero() {
                tokio::time::sleep(self.options.post_action_delay).await;
            }

            let prior_failures = failures.get(&step.identity).copied().unwrap_or(0);
            let step_result = StepResult::new(&step, started_at)
                .with_wait(wait.into())
                .with_attempts(prior_failures + 1);

            match result {
                Ok(action_report) if action_report.outcome == ActionOutcome::UserCancelled => {
                    warn!(
                        sequence_number,
                        step_id = %step.identity,
                        "operator cancelled at manual checkpoint; stopping run"
                    );
                    report.record(
                        step_result
                            .with_report(action_report)
                            .with_outcome(ExecutionOutcome::Skipped {
                                reason: "cancelled by operator".to_string(),
                            })
                            .finish(),
                    );
                    report.stop_at(sequence_number);
                    break;
                }
                Ok(action_report) => {
                    report.enter(StepState::Completed(sequence_number));
                    let outcome = match recovered.remove(&step.identity) {
                        Some(via) => ExecutionOutcome::Recovered { via },
                        None => ExecutionOutcome::Completed,
                    };
                    debug!(
                        sequence_number,
                        latency_ms = action_report.latency_ms,
                        ?outcome,
                        "step finished"
                    );
                    report.record(
                        step_result
                            .with_report(action_report)
                            .with_outcome(outcome)
                            .finish(),
                    );
                    cursor = plan.next_sequence_after(sequence_number);
                }
                Err(error) => {
                    report.enter(StepState::Failed(sequence_number));
                    let attempt = prior_failures + 1;
                    failures.insert(step.identity.clone(), attempt);
                    warn!(
                        sequence_number,
                        step_id = %step.identity,
                        action_kind = %step.action_kind,
                        kind = ?error.kind(),
                        attempt,
                        error = %error,
                        "step failed"
                    );

                    let action = if attempt > self.options.max_recovery_attempts {
                        warn!(
                            sequence_number,
                            max_recovery_attempts = self.options.max_recovery_attempts,
                            "recovery attempts exhausted"
                        );
                        RecoveryAction::Abandon
                    } else {
                        self.recovery
                            .recover(
                                plan,
                                &FailureContext {
                                    step: &step,
                                    error: &error,
                                    attempt,
                                },
                            )
                            .await?
                    };

                    match action {
                        RecoveryAction::Resume {
                            via,
                            sequence_number: resume_at,
                            step_id,
                        } => {
                            if step_id != step.identity {
                                failures.insert(step_id.clone(), attempt);
                            }
                            recovered.insert(step_id, via);
                            cursor = Some(resume_at);
                        }
                        RecoveryAction::Abandon => {
                            error!(
                                sequence_number,
                                step_id = %step.identity,
                                error = %error,
                                "step abandoned"
                            );
                            recovered.remove(&step.identity);
                            report.record(
                                step_result
                                    .with_outcome(ExecutionOutcome::Failed {
                                        kind: error.kind(),
                                        error: error.to_string(),
                                    })
                                    .finish(),
                            );
                            cursor = plan.next_sequence_after(sequence_number);
                        }
                    }
                }
            }
        }

        report.enter(StepState::Done);
        let report = report.finish();
        let counts = report.counts();
        info!(
            success = report.success(),
            completed = counts.completed,
            skipped = counts.skipped,
            failed = counts.failed,
            recovered = counts.recovered,
            latency_ms = report.latency_ms,
            "plan run finished"
        );
        Ok(report)
    }
}
