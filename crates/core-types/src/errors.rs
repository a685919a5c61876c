use thiserror::Error;

/// Errors raised while turning a run-input document into a [`crate::Plan`].
#[derive(Debug, Error)]
pub enum PlanLoadError {
    #[error("failed to parse plan document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("step #{sequence_number} has no action_type")]
    MissingAction { sequence_number: u32 },

    #[error("step #{sequence_number} has invalid sequence number")]
    InvalidSequence { sequence_number: i64 },

    #[error("duplicate step_order {0}")]
    DuplicateSequence(u32),

    #[error("duplicate step identity {0}")]
    DuplicateIdentity(String),

    #[error("step #{sequence_number}: unknown selector_type '{selector_type}'")]
    UnknownLocatorKind {
        sequence_number: u32,
        selector_type: String,
    },

    #[error("step #{sequence_number}: selector '{expression}' has no selector_type")]
    UnresolvableLocator {
        sequence_number: u32,
        expression: String,
    },
}
