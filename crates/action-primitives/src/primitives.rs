//! Built-in action handlers
//!
//! | kind | handler |
//! |---|---|
//! | `goto` | [`GotoHandler`] |
//! | `page_transition` | [`PageTransitionHandler`] |
//! | `click` | [`ClickHandler`] |
//! | `dismiss_modal` | [`DismissModalHandler`] |
//! | `enter_text` | [`EnterTextHandler`] |
//! | `enter_ocr_result`, `fill_stored_text` | [`StoredTextHandler`] |
//! | `select_option` | [`SelectOptionHandler`] |
//! | `select_mat_option_action` | [`CustomDropdownHandler`] |
//! | `force_chosen_value_injection_action` | [`ValueInjectionHandler`] |
//! | `capture_request_number` | [`CaptureTextHandler`] |
//! | `full_page_screenshot` | [`ScreenshotHandler`] |
//! | `manual`, `safe_action` | [`ManualHandler`] |
//! | `noop` | [`NoopHandler`] |

mod capture;
mod click;
mod manual;
mod navigate;
mod select;
mod type_text;

pub use capture::*;
pub use click::*;
pub use manual::*;
pub use navigate::*;
pub use select::*;
pub use type_text::*;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    dispatch::{ActionCtx, ActionHandler, DispatchTable},
    driver::BrowserDriver,
    errors::ActionError,
    types::ActionOutcome,
};

pub(crate) fn register_builtin(table: &mut DispatchTable) {
    table.register("goto", Arc::new(GotoHandler));
    table.register("page_transition", Arc::new(PageTransitionHandler::default()));
    table.register("click", Arc::new(ClickHandler));
    table.register("dismiss_modal", Arc::new(DismissModalHandler));
    table.register("enter_text", Arc::new(EnterTextHandler));

    let stored = Arc::new(StoredTextHandler);
    table.register("enter_ocr_result", stored.clone());
    table.register("fill_stored_text", stored);

    table.register("select_option", Arc::new(SelectOptionHandler));
    table.register("select_mat_option_action", Arc::new(CustomDropdownHandler::default()));
    table.register("force_chosen_value_injection_action", Arc::new(ValueInjectionHandler));
    table.register("capture_request_number", Arc::new(CaptureTextHandler::request_number()));
    table.register("full_page_screenshot", Arc::new(ScreenshotHandler));
    table.register("manual", Arc::new(ManualHandler::manual()));
    table.register("safe_action", Arc::new(ManualHandler::safe()));
    table.register("noop", Arc::new(NoopHandler));
}

/// Explicit no-op.
pub struct NoopHandler;

#[async_trait]
impl ActionHandler for NoopHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        debug!(sequence_number = ctx.step.sequence_number, "noop step");
        Ok(ActionOutcome::Completed)
    }
}

/// Close any open JavaScript dialog. Errors are logged and swallowed.
pub async fn dismiss_interruptions(driver: &dyn BrowserDriver, sequence_number: u32) -> Option<String> {
    match driver.dismiss_dialog().await {
        Ok(Some(message)) => {
            debug!(sequence_number, message = %message, "dismissed unexpected dialog");
            Some(message)
        }
        Ok(None) => None,
        Err(err) => {
            warn!(sequence_number, error = %err, "dialog dismissal failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDriver;

    #[test]
    fn dismissal_reports_message_once() {
        let driver = RecordingDriver::default();
        driver.push_dialog("Session expires soon");

        assert_eq!(
            tokio_test::block_on(dismiss_interruptions(&driver, 1)).as_deref(),
            Some("Session expires soon")
        );
        assert!(tokio_test::block_on(dismiss_interruptions(&driver, 1)).is_none());
    }

    #[test]
    fn builtin_catalogue_is_registered() {
        let table = DispatchTable::with_builtin();
        for kind in [
            "goto",
            "click",
            "enter_text",
            "select_option",
            "select_mat_option_action",
            "capture_request_number",
            "enter_ocr_result",
            "fill_stored_text",
            "force_chosen_value_injection_action",
            "full_page_screenshot",
            "manual",
            "safe_action",
            "dismiss_modal",
            "page_transition",
            "noop",
        ] {
            assert!(table.contains(kind), "missing {}", kind);
        }
    }
}
