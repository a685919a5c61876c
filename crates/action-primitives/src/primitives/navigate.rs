//! Navigation primitives

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::{
    dispatch::{ActionCtx, ActionHandler},
    errors::ActionError,
    types::ActionOutcome,
};

/// Navigate to the URL held in the payload value.
pub struct GotoHandler;

#[async_trait]
impl ActionHandler for GotoHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let url = ctx.require_payload()?;
        info!(sequence_number = ctx.step.sequence_number, url, "navigating");
        ctx.driver.navigate(url).await?;
        Ok(ActionOutcome::Completed)
    }
}

/// Click the step's element (when it has one) and wait for the next document
/// to finish loading.
///
/// The wait defaults to 10 seconds; a numeric `timeout_secs` metadata entry
/// overrides it.
pub struct PageTransitionHandler {
    pub timeout: Duration,
}

impl Default for PageTransitionHandler {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl ActionHandler for PageTransitionHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        if !ctx.step.locator.is_empty() {
            ctx.driver.click(&ctx.step.locator).await?;
        }

        let timeout = ctx
            .step
            .metadata
            .get("timeout_secs")
            .and_then(|value| value.as_f64())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(self.timeout);
        ctx.driver.wait_document_ready(timeout).await?;
        Ok(ActionOutcome::Completed)
    }
}
