use serde::{Deserialize, Serialize};

use crate::errors::TimingStoreError;

/// Smoothing factor used when none is configured.
pub const DEFAULT_ALPHA: f64 = 0.2;

/// Identity of a timing record.
///
/// `plan_id` is `None` for steps that ran outside an identified plan; those
/// records live in a global bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimingKey {
    pub plan_id: Option<String>,
    pub step_id: String,
    pub action_kind: String,
}

impl TimingKey {
    pub fn new(plan_id: Option<&str>, step_id: &str, action_kind: &str) -> Self {
        Self {
            plan_id: plan_id.map(str::to_string),
            step_id: step_id.to_string(),
            action_kind: action_kind.to_string(),
        }
    }
}

/// Learned readiness latency for one key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    /// Seconds.
    #[serde(rename = "ema")]
    pub estimate: f64,
    #[serde(rename = "count")]
    pub sample_count: u64,
}

impl TimingRecord {
    pub fn unsampled(default_secs: f64) -> Self {
        Self {
            estimate: default_secs,
            sample_count: 0,
        }
    }

    pub fn is_learned(&self) -> bool {
        self.sample_count > 0
    }

    /// Record after folding in `measured`. The first sample seeds the estimate.
    pub fn folded(self, measured: f64, alpha: f64) -> Self {
        let estimate = if self.sample_count == 0 {
            measured
        } else {
            ema(self.estimate, measured, alpha)
        };
        Self {
            estimate,
            sample_count: self.sample_count.saturating_add(1),
        }
    }
}

/// `alpha * measured + (1 - alpha) * previous`.
pub fn ema(previous: f64, measured: f64, alpha: f64) -> f64 {
    alpha * measured + (1.0 - alpha) * previous
}

/// One measurement to fold into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSample {
    pub key: TimingKey,
    pub plan_label: Option<String>,
    pub measured_secs: f64,
    pub alpha: f64,
}

impl TimingSample {
    pub fn new(key: TimingKey, measured_secs: f64) -> Self {
        Self {
            key,
            plan_label: None,
            measured_secs,
            alpha: DEFAULT_ALPHA,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.plan_label = label;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), TimingStoreError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(TimingStoreError::InvalidAlpha(self.alpha));
        }
        if !self.measured_secs.is_finite() || self.measured_secs < 0.0 {
            return Err(TimingStoreError::InvalidSample(self.measured_secs));
        }
        Ok(())
    }
}
