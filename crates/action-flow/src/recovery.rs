//! Recovery coordination for failed steps
//!
//! A failed step is presented to the [`FailureHandler`]; the decision is
//! committed to the step store before control returns to the executor, so
//! the next pass sees the corrected plan. The coordinator does not limit how
//! often it is invoked; the executor caps attempts per step.

use std::sync::Arc;

use action_primitives::{ActionError, FailureKind};
use serde::{Deserialize, Serialize};
use stepwright_core_types::{Plan, Step, StepId};
use tracing::{error, info, warn};

use crate::{
    errors::FlowError,
    ports::{ElementPicker, FailureHandler, StepAuthor},
    store::StepStore,
    types::RecoveryVia,
};

/// Operator verdict on a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryDecision {
    RetrySameBinding,
    RebindElement,
    ReplaceStep,
    Abandon,
}

/// What the decision-maker is shown
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    pub step: &'a Step,
    pub error: &'a ActionError,
    /// 1 for the first failure of this step in the run
    pub attempt: u32,
}

impl FailureContext<'_> {
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}

/// Where the executor goes next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Run the step at `sequence_number` again; it may be a new step
    Resume {
        via: RecoveryVia,
        sequence_number: u32,
        step_id: StepId,
    },
    /// Record the step as failed and move past it
    Abandon,
}

pub struct RecoveryCoordinator {
    store: Arc<dyn StepStore>,
    failure_handler: Arc<dyn FailureHandler>,
    picker: Arc<dyn ElementPicker>,
    author: Arc<dyn StepAuthor>,
}

impl RecoveryCoordinator {
    pub fn new(
        store: Arc<dyn StepStore>,
        failure_handler: Arc<dyn FailureHandler>,
        picker: Arc<dyn ElementPicker>,
        author: Arc<dyn StepAuthor>,
    ) -> Self {
        Self {
            store,
            failure_handler,
            picker,
            author,
        }
    }

    pub fn store(&self) -> &Arc<dyn StepStore> {
        &self.store
    }

    /// Ask for a decision and commit it.
    ///
    /// Collaborator refusals and store write failures degrade to `Abandon`;
    /// only a failed plan reload is an error.
    pub async fn recover(
        &self,
        plan: &mut Plan,
        failure: &FailureContext<'_>,
    ) -> Result<RecoveryAction, FlowError> {
        let step = failure.step;
        let decision = self.failure_handler.decide(failure).await;
        info!(
            sequence_number = step.sequence_number,
            step_id = %step.identity,
            ?decision,
            "recovery decision"
        );

        match decision {
            RecoveryDecision::RetrySameBinding => Ok(RecoveryAction::Resume {
                via: RecoveryVia::Retry,
                sequence_number: step.sequence_number,
                step_id: step.identity.clone(),
            }),
            RecoveryDecision::RebindElement => self.rebind(plan, step).await,
            RecoveryDecision::ReplaceStep => self.replace(plan, step).await,
            RecoveryDecision::Abandon => Ok(RecoveryAction::Abandon),
        }
    }

    async fn rebind(&self, plan: &mut Plan, step: &Step) -> Result<RecoveryAction, FlowError> {
        let Some(locator) = self.picker.pick_locator(step).await else {
            warn!(sequence_number = step.sequence_number, "no locator picked; abandoning step");
            return Ok(RecoveryAction::Abandon);
        };

        if let Err(err) = self.store.rebind_locator(&step.identity, locator.clone()) {
            error!(
                sequence_number = step.sequence_number,
                step_id = %step.identity,
                error = %err,
                "could not persist new locator; abandoning step"
            );
            return Ok(RecoveryAction::Abandon);
        }
        info!(sequence_number = step.sequence_number, locator = %locator, "locator rebound");

        self.reload(plan)?;
        Ok(RecoveryAction::Resume {
            via: RecoveryVia::Rebind,
            sequence_number: step.sequence_number,
            step_id: step.identity.clone(),
        })
    }

    async fn replace(&self, plan: &mut Plan, step: &Step) -> Result<RecoveryAction, FlowError> {
        let Some(mut replacement) = self.author.author_step(plan, step).await else {
            warn!(sequence_number = step.sequence_number, "no replacement authored; abandoning step");
            return Ok(RecoveryAction::Abandon);
        };
        replacement.sequence_number = step.sequence_number;

        if let Err(err) = self.store.delete_step(&step.identity) {
            error!(
                sequence_number = step.sequence_number,
                step_id = %step.identity,
                error = %err,
                "could not delete failing step; abandoning"
            );
            return Ok(RecoveryAction::Abandon);
        }

        let plan_id = plan.identity.clone();
        let sequence_number = match self
            .store
            .save_new_step(plan_id.as_ref(), replacement.clone())
        {
            Ok(sequence_number) => sequence_number,
            Err(err) => {
                error!(
                    sequence_number = step.sequence_number,
                    error = %err,
                    "could not save replacement step; restoring original"
                );
                if let Err(err) = self.store.save_new_step(plan_id.as_ref(), step.clone()) {
                    error!(step_id = %step.identity, error = %err, "could not restore original step");
                }
                self.reload(plan)?;
                return Ok(RecoveryAction::Abandon);
            }
        };
        info!(
            sequence_number,
            old_step_id = %step.identity,
            new_step_id = %replacement.identity,
            action_kind = %replacement.action_kind,
            "step replaced"
        );

        self.reload(plan)?;
        Ok(RecoveryAction::Resume {
            via: RecoveryVia::Replace,
            sequence_number,
            step_id: replacement.identity,
        })
    }

    fn reload(&self, plan: &mut Plan) -> Result<(), FlowError> {
        let steps = self.store.load_steps(plan.identity.as_ref())?;
        plan.replace_steps(steps);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NonInteractivePolicy;
    use crate::store::InMemoryStepStore;
    use async_trait::async_trait;
    use stepwright_core_types::Locator;

    struct Always(RecoveryDecision);

    #[async_trait]
    impl FailureHandler for Always {
        async fn decide(&self, _failure: &FailureContext<'_>) -> RecoveryDecision {
            self.0
        }
    }

    struct FixedAuthor;

    #[async_trait]
    impl StepAuthor for FixedAuthor {
        async fn author_step(&self, _plan: &Plan, _replacing: &Step) -> Option<Step> {
            Some(
                Step::new(0, "click")
                    .with_identity("replacement")
                    .with_locator(Locator::css("#other")),
            )
        }
    }

    fn plan() -> Plan {
        Plan::new(vec![
            Step::new(1, "goto").with_identity("a").with_value("http://x"),
            Step::new(2, "click")
                .with_identity("b")
                .with_locator(Locator::css("#old")),
            Step::new(3, "click").with_identity("c"),
        ])
    }

    #[test]
    fn replace_commits_before_resuming() {
        let store = Arc::new(InMemoryStepStore::new(plan()));
        let coordinator = RecoveryCoordinator::new(
            store.clone(),
            Arc::new(Always(RecoveryDecision::ReplaceStep)),
            Arc::new(NonInteractivePolicy),
            Arc::new(FixedAuthor),
        );

        let mut working = plan();
        let failing = working.steps[1].clone();
        let error = ActionError::ElementNotFound("css:#old".into());
        let action = tokio_test::block_on(coordinator.recover(
            &mut working,
            &FailureContext {
                step: &failing,
                error: &error,
                attempt: 1,
            },
        ))
        .unwrap();

        assert_eq!(
            action,
            RecoveryAction::Resume {
                via: RecoveryVia::Replace,
                sequence_number: 2,
                step_id: StepId::from("replacement"),
            }
        );
        let replaced = working.find_by_sequence(2).unwrap();
        assert_eq!(replaced.identity, StepId::from("replacement"));
        assert!(working.find(&StepId::from("b")).is_none());
        assert_eq!(working.steps.len(), 3);
    }

    #[test]
    fn refused_collaborators_abandon_without_touching_plan() {
        let store = Arc::new(InMemoryStepStore::new(plan()));
        for decision in [RecoveryDecision::RebindElement, RecoveryDecision::ReplaceStep] {
            let coordinator = RecoveryCoordinator::new(
                store.clone(),
                Arc::new(Always(decision)),
                Arc::new(NonInteractivePolicy),
                Arc::new(NonInteractivePolicy),
            );
            let mut working = plan();
            let failing = working.steps[1].clone();
            let error = ActionError::ElementNotFound("css:#old".into());
            let action = tokio_test::block_on(coordinator.recover(
                &mut working,
                &FailureContext {
                    step: &failing,
                    error: &error,
                    attempt: 1,
                },
            ))
            .unwrap();

            assert_eq!(action, RecoveryAction::Abandon);
            assert_eq!(store.load_plan().unwrap().steps, plan().steps);
        }
    }
}
