//! Timing model for adaptive waits
//!
//! Keeps, per (plan, step, action) key, an exponential moving average of how
//! long the action took to become performable. Callers are expected to keep a
//! single writer per process; persisted documents are rewritten whole on every
//! update and the last write wins.

pub mod errors;
pub mod file;
pub mod memory;
pub mod model;

pub use errors::TimingStoreError;
pub use file::JsonFileTimingStore;
pub use memory::InMemoryTimingStore;
pub use model::{ema, TimingKey, TimingRecord, TimingSample, DEFAULT_ALPHA};

/// Key-value service holding learned estimates.
pub trait TimingStore: Send + Sync {
    /// Stored record, or a zero-sample record seeded with `default_secs`.
    fn get(
        &self,
        plan_id: Option<&str>,
        step_id: &str,
        action_kind: &str,
        default_secs: f64,
    ) -> TimingRecord;

    /// Fold a measurement into the estimate and return the new record.
    ///
    /// The in-memory estimate is updated before anything is persisted; an
    /// `Err` from a durable store means only the write-through failed.
    fn update(&self, sample: &TimingSample) -> Result<TimingRecord, TimingStoreError>;

    /// All known records, sorted by key.
    fn snapshot(&self) -> Vec<(TimingKey, TimingRecord)>;
}
