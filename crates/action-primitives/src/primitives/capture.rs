//! Extraction and artifact primitives

use std::path::PathBuf;

use async_trait::async_trait;
use stepwright_core_types::REQUEST_NUMBER_SLOT;
use tracing::{info, warn};

use crate::{
    dispatch::{ActionCtx, ActionHandler},
    errors::ActionError,
    types::ActionOutcome,
};

const DEFAULT_SCREENSHOT_NAME: &str = "full_page_screenshot.png";

/// Read the element's text into the run context.
///
/// The text always becomes `last_extracted_text`; it is also stored under
/// the handler's slot, or the slot named by the `slot` metadata entry. A
/// second capture into the same slot overwrites the first.
pub struct CaptureTextHandler {
    pub slot: Option<String>,
}

impl CaptureTextHandler {
    pub fn request_number() -> Self {
        Self {
            slot: Some(REQUEST_NUMBER_SLOT.to_string()),
        }
    }
}

#[async_trait]
impl ActionHandler for CaptureTextHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let locator = ctx.require_locator()?;
        let text = ctx.driver.read_text(locator).await?.trim().to_string();
        if text.is_empty() {
            warn!(sequence_number = ctx.step.sequence_number, locator = %locator, "captured empty text");
        }

        let slot = ctx
            .step
            .metadata_str("slot")
            .map(str::to_string)
            .or_else(|| self.slot.clone());
        info!(
            sequence_number = ctx.step.sequence_number,
            slot = slot.as_deref().unwrap_or("-"),
            "text captured"
        );
        ctx.run_context.record_extracted(slot.as_deref(), text);
        Ok(ActionOutcome::Completed)
    }
}

/// Save a full-page PNG screenshot.
///
/// The payload value names the output file; relative paths and the default
/// name resolve under the artifacts directory.
pub struct ScreenshotHandler;

impl ScreenshotHandler {
    pub fn output_path(ctx: &ActionCtx<'_>) -> PathBuf {
        let requested = ctx.step.payload_value.trim();
        let name = if requested.is_empty() {
            DEFAULT_SCREENSHOT_NAME
        } else {
            requested
        };
        ctx.artifacts_dir.join(name)
    }
}

#[async_trait]
impl ActionHandler for ScreenshotHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let path = Self::output_path(ctx);
        let png = ctx.driver.screenshot(true).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ActionError::Io(format!("{}: {}", parent.display(), err)))?;
        }
        tokio::fs::write(&path, &png)
            .await
            .map_err(|err| ActionError::Io(format!("{}: {}", path.display(), err)))?;

        info!(
            sequence_number = ctx.step.sequence_number,
            path = %path.display(),
            bytes = png.len(),
            "screenshot saved"
        );
        Ok(ActionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDriver;
    use stepwright_core_types::{Locator, RunContext, Step};
    use tempfile::tempdir;

    #[test]
    fn request_number_is_stored_in_slot_and_last_text() {
        let driver = RecordingDriver::default();
        let locator = Locator::css("span.request");
        driver.set_text(&locator, "  REQ-2024-001 \n");
        let step = Step::new(8, "capture_request_number").with_locator(locator);
        let mut context = RunContext::new();
        let dir = tempdir().unwrap();
        let mut ctx = ActionCtx::new(&driver, &step, &mut context, dir.path());

        tokio_test::block_on(CaptureTextHandler::request_number().execute(&mut ctx)).unwrap();
        assert_eq!(context.captured(REQUEST_NUMBER_SLOT), Some("REQ-2024-001"));
        assert_eq!(context.last_extracted_text.as_deref(), Some("REQ-2024-001"));
    }

    #[tokio::test]
    async fn screenshot_is_written_under_artifacts_dir() {
        let driver = RecordingDriver::default();
        let step = Step::new(10, "full_page_screenshot").with_value("shots/final.png");
        let mut context = RunContext::new();
        let dir = tempdir().unwrap();
        let mut ctx = ActionCtx::new(&driver, &step, &mut context, dir.path());

        ScreenshotHandler.execute(&mut ctx).await.unwrap();
        let written = std::fs::read(dir.path().join("shots/final.png")).unwrap();
        assert_eq!(&written[1..4], b"PNG");
    }
}
