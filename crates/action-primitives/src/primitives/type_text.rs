//! Text entry primitives

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    dispatch::{ActionCtx, ActionHandler},
    errors::ActionError,
    types::ActionOutcome,
};

/// Clear the field and type the payload value. An empty payload clears it.
pub struct EnterTextHandler;

#[async_trait]
impl ActionHandler for EnterTextHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let locator = ctx.require_locator()?;
        ctx.driver
            .type_text(locator, &ctx.step.payload_value)
            .await?;
        debug!(
            sequence_number = ctx.step.sequence_number,
            chars = ctx.step.payload_value.chars().count(),
            "text entered"
        );
        Ok(ActionOutcome::Completed)
    }
}

/// Type text captured earlier in the run.
///
/// Reads the named slot given by the `source_slot` metadata entry, else the
/// most recently extracted text. Nothing captured types an empty string.
pub struct StoredTextHandler;

#[async_trait]
impl ActionHandler for StoredTextHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let locator = ctx.require_locator()?;
        let stored = match ctx.step.metadata_str("source_slot") {
            Some(slot) => ctx.run_context.captured(slot).map(str::to_string),
            None => ctx.run_context.last_extracted_text.clone(),
        };
        let text = stored.unwrap_or_else(|| {
            warn!(
                sequence_number = ctx.step.sequence_number,
                "no stored text in run context; typing empty value"
            );
            String::new()
        });

        ctx.driver.type_text(locator, &text).await?;
        Ok(ActionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDriver;
    use serde_json::json;
    use std::path::Path;
    use stepwright_core_types::{Locator, RunContext, Step, REQUEST_NUMBER_SLOT};

    #[test]
    fn stored_text_prefers_named_slot() {
        let driver = RecordingDriver::default();
        let mut context = RunContext::new();
        context.record_extracted(Some(REQUEST_NUMBER_SLOT), "REQ-42");
        context.record_extracted(None, "CAPTCHA");

        let step = Step::new(5, "fill_stored_text").with_locator(Locator::css("#captcha"));
        let mut ctx = ActionCtx::new(&driver, &step, &mut context, Path::new("."));
        tokio_test::block_on(StoredTextHandler.execute(&mut ctx)).unwrap();

        let step = Step::new(6, "fill_stored_text")
            .with_locator(Locator::css("#req"))
            .with_metadata("source_slot", json!(REQUEST_NUMBER_SLOT));
        let mut ctx = ActionCtx::new(&driver, &step, &mut context, Path::new("."));
        tokio_test::block_on(StoredTextHandler.execute(&mut ctx)).unwrap();

        assert_eq!(
            driver.calls(),
            vec!["type css:#captcha CAPTCHA", "type css:#req REQ-42"]
        );
    }

    #[test]
    fn missing_element_surfaces_as_not_found() {
        let driver = RecordingDriver::default();
        let locator = Locator::css("#name");
        driver.set_missing(&locator);
        let step = Step::new(2, "enter_text").with_locator(locator).with_value("Ann");
        let mut context = RunContext::new();
        let mut ctx = ActionCtx::new(&driver, &step, &mut context, Path::new("."));

        let err = tokio_test::block_on(EnterTextHandler.execute(&mut ctx)).unwrap_err();
        assert!(matches!(err, ActionError::ElementNotFound(_)));
    }
}
