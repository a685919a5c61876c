//! Flow execution error types

use std::io;
use std::path::PathBuf;

use action_primitives::UnknownAction;
use stepwright_core_types::PlanLoadError;
use thiserror::Error;

/// Errors that stop a run from starting or continuing.
///
/// Step failures are not errors at this level; they go through recovery and
/// end up in the run report.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The step store could not be read or reloaded
    #[error("Step store error: {0}")]
    Store(#[from] StepStoreError),

    /// Plan uses action kinds with no handler and the policy rejects them
    #[error("Plan uses unknown actions: {}", describe_unknown(.0))]
    UnknownActions(Vec<UnknownAction>),
}

fn describe_unknown(unknown: &[UnknownAction]) -> String {
    unknown
        .iter()
        .map(|u| format!("#{} '{}'", u.sequence_number, u.action_kind))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Step persistence errors
#[derive(Debug, Error)]
pub enum StepStoreError {
    #[error("Step document {path} could not be read: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Step document {path} could not be written: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Invalid step document: {0}")]
    Document(#[from] PlanLoadError),

    #[error("No step with identity {0}")]
    StepNotFound(String),

    #[error("Step identity {0} already exists")]
    DuplicateIdentity(String),

    #[error("Store does not hold plan {0}")]
    UnknownPlan(String),

    #[error("Locator {0} cannot be resolved")]
    InvalidLocator(String),
}
