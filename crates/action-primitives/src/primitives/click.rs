//! Click primitives

use async_trait::async_trait;
use stepwright_core_types::Locator;
use tracing::{debug, error, warn};

use crate::{
    dispatch::{ActionCtx, ActionHandler},
    errors::ActionError,
    types::ActionOutcome,
};

/// Close button of the common Bootstrap-style modal.
const MODAL_CLOSE_BUTTON: &str = "div.modal-content button.close";
const MODAL_REMOVE_SCRIPT: &str =
    "(function(){ var modal = document.querySelector('div.modal-content'); if (modal) { modal.remove(); return true; } return false; })()";

pub struct ClickHandler;

#[async_trait]
impl ActionHandler for ClickHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let locator = ctx.require_locator()?;
        ctx.driver.click(locator).await?;
        debug!(sequence_number = ctx.step.sequence_number, locator = %locator, "clicked");
        Ok(ActionOutcome::Completed)
    }
}

/// Close an in-page modal by clicking its close button, removing the modal
/// from the DOM if that fails. Never fails the step.
///
/// The step locator, when set, overrides the default close button.
pub struct DismissModalHandler;

#[async_trait]
impl ActionHandler for DismissModalHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let close_button = if ctx.step.locator.is_empty() {
            Locator::css(MODAL_CLOSE_BUTTON)
        } else {
            ctx.step.locator.clone()
        };

        match ctx.driver.click(&close_button).await {
            Ok(()) => debug!(sequence_number = ctx.step.sequence_number, "modal closed via button"),
            Err(err) => {
                warn!(
                    sequence_number = ctx.step.sequence_number,
                    error = %err,
                    "modal close button failed; removing modal from the DOM"
                );
                if let Err(err) = ctx.driver.execute_script(MODAL_REMOVE_SCRIPT).await {
                    error!(sequence_number = ctx.step.sequence_number, error = %err, "could not remove modal");
                }
            }
        }
        Ok(ActionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDriver;
    use std::path::Path;
    use stepwright_core_types::{RunContext, Step};

    #[test]
    fn click_without_locator_is_a_locator_failure() {
        let driver = RecordingDriver::default();
        let step = Step::new(3, "click");
        let mut context = RunContext::new();
        let mut ctx = ActionCtx::new(&driver, &step, &mut context, Path::new("."));

        let err = tokio_test::block_on(ClickHandler.execute(&mut ctx)).unwrap_err();
        assert_eq!(err.kind(), crate::FailureKind::Locator);
    }

    #[test]
    fn dismiss_modal_falls_back_to_removal() {
        let driver = RecordingDriver::default();
        driver.set_missing(&Locator::css(MODAL_CLOSE_BUTTON));
        let step = Step::new(1, "dismiss_modal");
        let mut context = RunContext::new();
        let mut ctx = ActionCtx::new(&driver, &step, &mut context, Path::new("."));

        let outcome = tokio_test::block_on(DismissModalHandler.execute(&mut ctx)).unwrap();
        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(driver.calls(), vec![format!("script {}", MODAL_REMOVE_SCRIPT)]);
    }
}
