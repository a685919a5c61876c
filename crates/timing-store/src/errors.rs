use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimingStoreError {
    #[error("invalid smoothing factor {0}; expected 0 < alpha <= 1")]
    InvalidAlpha(f64),

    #[error("invalid measurement {0}s")]
    InvalidSample(f64),

    #[error("timing document {path} could not be read: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("timing document {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("timing document {path} could not be written: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("plan id '{0}' is reserved in the timing document")]
    ReservedPlanId(String),

    #[error("timing document could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}
