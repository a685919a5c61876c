//! Operator checkpoints

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    dispatch::{ActionCtx, ActionHandler},
    errors::ActionError,
    types::{ActionOutcome, ManualDecision, ManualRequest},
};

const MANUAL_INSTRUCTIONS: &str =
    "This step requires manual intervention. Perform the action described below in the browser, then continue.";
const SAFE_INSTRUCTIONS: &str =
    "This step requires sensitive manual intervention. Complete the operation in the browser and confirm every checklist item before continuing.";
const SAFE_CHECKLIST: &[&str] = &[
    "Request number saved",
    "Paid",
    "Receipt saved",
    "Recorded in CRM",
];

/// Pause until the operator confirms. Declining yields `UserCancelled`, as
/// does running without an operator attached.
pub struct ManualHandler {
    instructions: &'static str,
    checklist: &'static [&'static str],
}

impl ManualHandler {
    pub fn manual() -> Self {
        Self {
            instructions: MANUAL_INSTRUCTIONS,
            checklist: &[],
        }
    }

    /// Checkpoint with a mandatory checklist, for payment-like steps.
    pub fn safe() -> Self {
        Self {
            instructions: SAFE_INSTRUCTIONS,
            checklist: SAFE_CHECKLIST,
        }
    }
}

#[async_trait]
impl ActionHandler for ManualHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let Some(port) = ctx.manual else {
            warn!(
                sequence_number = ctx.step.sequence_number,
                "manual step reached with no operator attached; cancelling"
            );
            return Ok(ActionOutcome::UserCancelled);
        };

        let decision = port
            .confirm(ManualRequest {
                step: ctx.step,
                instructions: self.instructions,
                checklist: self.checklist,
            })
            .await;
        info!(sequence_number = ctx.step.sequence_number, ?decision, "manual checkpoint answered");

        Ok(match decision {
            ManualDecision::Continue => ActionOutcome::Completed,
            ManualDecision::Cancel => ActionOutcome::UserCancelled,
        })
    }
}
