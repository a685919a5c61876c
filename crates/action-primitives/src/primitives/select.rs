//! Selection primitives for native and custom dropdowns

use std::time::Duration;

use async_trait::async_trait;
use stepwright_core_types::Locator;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    dispatch::{ActionCtx, ActionHandler},
    driver::element_expression,
    errors::ActionError,
    types::ActionOutcome,
};

/// Select an `<option>` of a native `<select>` by visible text.
pub struct SelectOptionHandler;

#[async_trait]
impl ActionHandler for SelectOptionHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let locator = ctx.require_locator()?;
        let option = ctx.require_payload()?;
        ctx.driver.select_option(locator, option).await?;
        Ok(ActionOutcome::Completed)
    }
}

/// Open a custom (Angular Material style) dropdown and click the option whose
/// normalized text matches the payload, case-insensitively.
pub struct CustomDropdownHandler {
    pub option_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for CustomDropdownHandler {
    fn default() -> Self {
        Self {
            option_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl CustomDropdownHandler {
    pub fn option_locator(text: &str) -> Locator {
        Locator::xpath(format!(
            "//mat-option[translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz')={}]",
            xpath_literal(&text.trim().to_lowercase())
        ))
    }
}

#[async_trait]
impl ActionHandler for CustomDropdownHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let trigger = ctx.require_locator()?;
        let text = ctx.require_payload()?;
        ctx.driver.click(trigger).await?;

        let option = Self::option_locator(text);
        let deadline = Instant::now() + self.option_timeout;
        loop {
            let ready = matches!(
                ctx.driver.find(&option).await,
                Ok(Some(state)) if state.is_interactable()
            );
            if ready {
                break;
            }
            if Instant::now() >= deadline {
                return Err(ActionError::OptionNotFound(format!(
                    "'{}' in {}",
                    text, trigger
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        ctx.driver.click(&option).await?;
        debug!(sequence_number = ctx.step.sequence_number, option = text, "custom option selected");
        Ok(ActionOutcome::Completed)
    }
}

/// Write the payload straight into a "chosen"-style widget, bypassing its
/// dropdown: the container gets a single selected item, the underlying
/// `<select>` or `<input>` (if any) gets the value and a `change` event.
pub struct ValueInjectionHandler;

impl ValueInjectionHandler {
    pub fn script(locator: &Locator, value: &str) -> String {
        let quoted = serde_json::Value::String(value.to_string()).to_string();
        format!(
            r#"(function(){{
  var el = {element};
  if (!el) {{ return false; }}
  var value = {value};
  var item = document.createElement('li');
  item.className = 'result-selected';
  item.textContent = value;
  el.innerHTML = '';
  el.appendChild(item);
  var scope = el.closest('.chosen-container') ? el.closest('.chosen-container').parentElement : el.parentElement;
  var field = scope ? scope.querySelector('select, input[type=hidden]') : null;
  if (field) {{
    field.value = value;
    field.dispatchEvent(new Event('change', {{ bubbles: true }}));
  }}
  return true;
}})()"#,
            element = element_expression(locator),
            value = quoted
        )
    }
}

#[async_trait]
impl ActionHandler for ValueInjectionHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        let locator = ctx.require_locator()?;
        let value = ctx.require_payload()?;
        let found = ctx
            .driver
            .execute_script(&Self::script(locator, value))
            .await?;
        if found == serde_json::Value::Bool(false) {
            return Err(ActionError::ElementNotFound(locator.to_string()));
        }
        debug!(sequence_number = ctx.step.sequence_number, value, "value injected");
        Ok(ActionOutcome::Completed)
    }
}

/// XPath string literal for `text`, using `concat()` when it holds both
/// quote kinds.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|part| format!("'{}'", part)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
