//! Browser driver port

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepwright_core_types::{Locator, LocatorKind};

use crate::errors::DriverError;

/// Observable state of a resolved element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub displayed: bool,
    pub enabled: bool,
}

impl ElementState {
    pub fn interactable() -> Self {
        Self {
            displayed: true,
            enabled: true,
        }
    }

    pub fn is_interactable(&self) -> bool {
        self.displayed && self.enabled
    }
}

/// Capabilities the engine needs from a browser session.
///
/// Element operations address elements by locator; implementations resolve
/// the locator on every call. A driver is owned by one executor for the
/// duration of a run.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// `Ok(None)` when nothing matches.
    async fn find(&self, locator: &Locator) -> Result<Option<ElementState>, DriverError>;

    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Clear the field then type `text`.
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// Select an `<option>` by visible text, exact match first then
    /// case-insensitive.
    async fn select_option(&self, locator: &Locator, option: &str) -> Result<(), DriverError>;

    /// Text content of the element, falling back to its `value`.
    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError>;

    /// Set the element's value directly and fire `input`/`change`.
    async fn set_value(&self, locator: &Locator, value: &str) -> Result<(), DriverError>;

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// PNG bytes.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError>;

    /// Close an open JavaScript dialog, returning its message if one was open.
    async fn dismiss_dialog(&self) -> Result<Option<String>, DriverError>;

    async fn wait_document_ready(&self, timeout: Duration) -> Result<(), DriverError>;
}

/// JavaScript expression evaluating to the first element matching `locator`,
/// or `null`.
pub fn element_expression(locator: &Locator) -> String {
    let quoted = serde_json::Value::String(locator.expression.clone()).to_string();
    match locator.kind {
        LocatorKind::XPath => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            quoted
        ),
        LocatorKind::Css | LocatorKind::None => format!("document.querySelector({})", quoted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_expression_quotes_selector() {
        let css = element_expression(&Locator::css("input[name=\"a\"]"));
        assert_eq!(css, r#"document.querySelector("input[name=\"a\"]")"#);

        let xpath = element_expression(&Locator::xpath("//div[@id='x']"));
        assert!(xpath.starts_with(r#"document.evaluate("//div[@id='x']""#));
    }
}
