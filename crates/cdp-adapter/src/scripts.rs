//! Page scripts built around a locator's element expression

use action_primitives::element_expression;
use stepwright_core_types::Locator;

/// `null` when missing, else `{displayed, enabled}`.
pub(crate) fn element_state(locator: &Locator) -> String {
    format!(
        "(function(){{ var el = {}; if (!el) return null; \
         var style = window.getComputedStyle(el); var rect = el.getBoundingClientRect(); \
         return {{ displayed: style.display !== 'none' && style.visibility !== 'hidden' \
         && (rect.width > 0 || rect.height > 0), enabled: !el.disabled }}; }})()",
        element_expression(locator)
    )
}

/// Visible text, falling back to the form value. `null` when missing.
pub(crate) fn read_text(locator: &Locator) -> String {
    format!(
        "(function(){{ var el = {}; if (!el) return null; \
         var text = (el.innerText || el.textContent || '').trim(); \
         return text.length ? text : (el.value || ''); }})()",
        element_expression(locator)
    )
}

/// Clear the field so typing replaces its content. `false` when missing.
pub(crate) fn clear_value(locator: &Locator) -> String {
    format!(
        "(function(){{ var el = {}; if (!el) return false; \
         if ('value' in el) {{ el.value = ''; }} return true; }})()",
        element_expression(locator)
    )
}

/// Set the value and fire input/change. `false` when missing.
pub(crate) fn set_value(locator: &Locator, value: &str) -> String {
    format!(
        "(function(){{ var el = {}; if (!el) return false; el.value = {}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        element_expression(locator),
        quote(value)
    )
}

/// Pick a `<select>` option by visible text, then by value.
/// Returns `"missing"`, `"no-option"` or `"ok"`.
pub(crate) fn select_option(locator: &Locator, option: &str) -> String {
    format!(
        "(function(){{ var el = {}; if (!el) return 'missing'; var wanted = {}; \
         var options = Array.prototype.slice.call(el.options || []); \
         var match = options.find(function(o){{ return o.text.trim() === wanted; }}) \
           || options.find(function(o){{ return o.value === wanted; }}); \
         if (!match) return 'no-option'; el.value = match.value; match.selected = true; \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return 'ok'; }})()",
        element_expression(locator),
        quote(option)
    )
}

pub(crate) const DOCUMENT_READY: &str = "document.readyState === 'complete'";

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_embed_quoted_payloads() {
        let script = set_value(&Locator::css("#name"), "O'Brien \"Jr\"");
        assert!(script.contains(r##"document.querySelector("#name")"##));
        assert!(script.contains(r#""O'Brien \"Jr\"""#));

        let script = select_option(&Locator::xpath("//select"), "Yes");
        assert!(script.contains("document.evaluate(\"//select\""));
        assert!(script.contains("'no-option'"));
    }
}
