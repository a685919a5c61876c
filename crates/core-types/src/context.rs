//! Run-scoped context passed through the executor

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named slot written by `capture_request_number`.
pub const REQUEST_NUMBER_SLOT: &str = "REQUEST_NUMBER";

/// Context owned by one plan run.
///
/// `variables` feed condition gates and stay constant for the duration of a
/// pass. `last_extracted_text` and `captured` are the cross-step memory that
/// extraction actions write and fill actions read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    #[serde(default)]
    pub last_extracted_text: Option<String>,

    #[serde(default)]
    pub captured: BTreeMap<String, String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Record extracted text, optionally under a named slot as well.
    pub fn record_extracted(&mut self, slot: Option<&str>, text: impl Into<String>) {
        let text = text.into();
        if let Some(slot) = slot {
            self.captured.insert(slot.to_string(), text.clone());
        }
        self.last_extracted_text = Some(text);
    }

    pub fn captured(&self, slot: &str) -> Option<&str> {
        self.captured.get(slot).map(String::as_str)
    }

    /// Clears extraction slots while keeping gate variables; used when a run
    /// restarts from the beginning.
    pub fn reset_extractions(&mut self) {
        self.last_extracted_text = None;
        self.captured.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracted_text_updates_last_and_slot() {
        let mut ctx = RunContext::new().with_variable("IS_MINOR_TRUE", json!(false));
        ctx.record_extracted(Some(REQUEST_NUMBER_SLOT), "REQ-1");
        ctx.record_extracted(None, "other");

        assert_eq!(ctx.last_extracted_text.as_deref(), Some("other"));
        assert_eq!(ctx.captured(REQUEST_NUMBER_SLOT), Some("REQ-1"));

        ctx.reset_extractions();
        assert!(ctx.last_extracted_text.is_none());
        assert_eq!(ctx.variable("IS_MINOR_TRUE"), Some(&json!(false)));
    }
}
