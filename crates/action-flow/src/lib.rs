//! Step execution layer
//!
//! Runs a plan step by step: condition gating, adaptive readiness waits,
//! action dispatch and operator-driven recovery. A [`RunSession`] repeats
//! runs for as long as the operator asks to continue.

pub mod errors;
pub mod executor;
pub mod ports;
pub mod recovery;
pub mod session;
pub mod store;
pub mod types;

pub use errors::{FlowError, StepStoreError};
pub use executor::StepExecutor;
pub use ports::{
    ContinuationChoice, ContinuationPort, ElementPicker, FailureHandler, NonInteractivePolicy,
    StepAuthor,
};
pub use recovery::{FailureContext, RecoveryAction, RecoveryCoordinator, RecoveryDecision};
pub use session::RunSession;
pub use store::{InMemoryStepStore, JsonStepStore, StepStore};
pub use types::{
    ExecutionOutcome, OutcomeCounts, RecoveryVia, RunOptions, RunReport, RunStatus, StepResult,
    StepState, UnknownActionPolicy, WaitSummary,
};
