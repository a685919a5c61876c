//! Error types for driver calls and action handlers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a browser backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverError {
    #[error("no element matches {0}")]
    NotFound(String),

    #[error("element {0} is not interactable")]
    NotInteractable(String),

    #[error("option '{option}' not found in {locator}")]
    OptionNotFound { locator: String, option: String },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// How a step failure is classified before recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The target element could not be resolved.
    Locator,
    /// The handler itself failed.
    Dispatch,
}

/// Failure of a single action handler.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// Element could not be resolved from the step locator
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element is present but hidden, disabled or obscured
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Dropdown option was not found
    #[error("Option not found: {0}")]
    OptionNotFound(String),

    /// Navigation or page transition timed out
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// The step carries no locator but the action needs one
    #[error("Action '{0}' requires a locator")]
    MissingLocator(String),

    /// The step carries no payload value but the action needs one
    #[error("Action '{0}' requires a value")]
    MissingPayload(String),

    /// Filesystem error while writing an artifact
    #[error("Artifact I/O error: {0}")]
    Io(String),

    /// Any other backend failure
    #[error("Driver error: {0}")]
    Driver(String),
}

impl ActionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ActionError::ElementNotFound(_) | ActionError::MissingLocator(_) => {
                FailureKind::Locator
            }
            _ => FailureKind::Dispatch,
        }
    }

    /// Check if retrying the same step unchanged may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::NavTimeout(_)
                | ActionError::NotInteractable(_)
                | ActionError::ElementNotFound(_)
                | ActionError::Driver(_)
        )
    }
}

impl From<DriverError> for ActionError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotFound(locator) => ActionError::ElementNotFound(locator),
            DriverError::NotInteractable(locator) => ActionError::NotInteractable(locator),
            DriverError::OptionNotFound { locator, option } => {
                ActionError::OptionNotFound(format!("'{}' in {}", option, locator))
            }
            DriverError::Timeout(detail) => ActionError::NavTimeout(detail),
            other => ActionError::Driver(other.to_string()),
        }
    }
}
