//! Error types for gate evaluation

use thiserror::Error;

/// Gate evaluation error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GateError {
    /// Condition key absent from the registry
    #[error("Condition key not found in registry: {0}")]
    MissingKey(String),

    /// Expression source could not be parsed
    #[error("Invalid condition expression '{source_text}': {reason}")]
    Parse { source_text: String, reason: String },

    /// Expression referenced a variable absent from the run context
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Expression evaluated but could not produce a boolean
    #[error("Condition evaluation failed: {0}")]
    Evaluation(String),
}

impl GateError {
    pub(crate) fn parse(source_text: &str, reason: impl Into<String>) -> Self {
        GateError::Parse {
            source_text: source_text.to_string(),
            reason: reason.into(),
        }
    }
}
