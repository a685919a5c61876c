//! Adaptive readiness waiting
//!
//! Polls a readiness probe until it passes or a ceiling elapses. The ceiling
//! comes from the timing store when it has learned one for the step, else from
//! the caller. Every wait feeds its measurement back into the store, timeouts
//! included, so habitually slow steps converge to a realistic ceiling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stepwright_core_types::Locator;
use stepwright_timing_store::{TimingKey, TimingSample, TimingStore, DEFAULT_ALPHA};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{driver::BrowserDriver, errors::DriverError};

/// Non-mutating readiness test.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self) -> Result<bool, DriverError>;
}

/// Passes when the locator resolves to a displayed, enabled element.
/// An empty locator passes immediately.
pub struct LocatorProbe<'a> {
    driver: &'a dyn BrowserDriver,
    locator: &'a Locator,
}

impl<'a> LocatorProbe<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, locator: &'a Locator) -> Self {
        Self { driver, locator }
    }
}

#[async_trait]
impl ReadinessProbe for LocatorProbe<'_> {
    async fn probe(&self) -> Result<bool, DriverError> {
        if self.locator.is_empty() {
            return Ok(true);
        }
        Ok(self
            .driver
            .find(self.locator)
            .await?
            .map_or(false, |state| state.is_interactable()))
    }
}

/// Wait configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitSettings {
    /// Ceiling used until a step has a learned estimate
    pub default_ceiling: Duration,
    pub poll_interval: Duration,
    /// EMA smoothing factor
    pub alpha: f64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            default_ceiling: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// Identity of the step being waited on.
#[derive(Debug, Clone, Copy)]
pub struct WaitTarget<'a> {
    pub step_id: &'a str,
    pub action_kind: &'a str,
    pub plan_id: Option<&'a str>,
    pub plan_label: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOutcome {
    pub ready: bool,
    /// Elapsed time at success, or the ceiling on timeout
    pub measured: Duration,
    pub ceiling: Duration,
    /// Whether the ceiling came from the timing store
    pub learned: bool,
}

pub struct AdaptiveWaiter {
    store: Arc<dyn TimingStore>,
    settings: WaitSettings,
}

impl AdaptiveWaiter {
    pub fn new(store: Arc<dyn TimingStore>, settings: WaitSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &WaitSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn TimingStore> {
        &self.store
    }

    /// Wait using the configured default ceiling.
    pub async fn await_step(&self, probe: &dyn ReadinessProbe, target: WaitTarget<'_>) -> WaitOutcome {
        self.await_ready(probe, self.settings.default_ceiling, target)
            .await
    }

    /// Poll `probe` until it passes or the effective ceiling elapses.
    ///
    /// Probe errors count as "not ready" for that poll. The probe runs at
    /// least once even when the ceiling is zero. The measurement is written
    /// to the timing store exactly once.
    pub async fn await_ready(
        &self,
        probe: &dyn ReadinessProbe,
        ceiling: Duration,
        target: WaitTarget<'_>,
    ) -> WaitOutcome {
        let (ceiling, learned) = self.effective_ceiling(ceiling, &target);
        let poll_interval = self.settings.poll_interval.max(Duration::from_millis(1));
        let started = Instant::now();

        let (ready, measured) = loop {
            let passed = match probe.probe().await {
                Ok(passed) => passed,
                Err(err) => {
                    debug!(step_id = target.step_id, error = %err, "readiness probe failed; treating as not ready");
                    false
                }
            };
            let elapsed = started.elapsed();
            if passed {
                break (true, elapsed);
            }
            if elapsed >= ceiling {
                break (false, ceiling);
            }
            tokio::time::sleep(poll_interval.min(ceiling - elapsed)).await;
        };

        debug!(
            step_id = target.step_id,
            action_kind = target.action_kind,
            ready,
            learned,
            measured_ms = measured.as_millis() as u64,
            ceiling_ms = ceiling.as_millis() as u64,
            "adaptive wait finished"
        );

        self.record(&target, measured);

        WaitOutcome {
            ready,
            measured,
            ceiling,
            learned,
        }
    }

    fn effective_ceiling(&self, fallback: Duration, target: &WaitTarget<'_>) -> (Duration, bool) {
        let record = self.store.get(
            target.plan_id,
            target.step_id,
            target.action_kind,
            fallback.as_secs_f64(),
        );
        if !record.is_learned() {
            return (fallback, false);
        }
        match Duration::try_from_secs_f64(record.estimate) {
            Ok(ceiling) => (ceiling, true),
            Err(_) => {
                warn!(
                    step_id = target.step_id,
                    action_kind = target.action_kind,
                    estimate = record.estimate,
                    "stored estimate is not a valid duration; using default ceiling"
                );
                (fallback, false)
            }
        }
    }

    fn record(&self, target: &WaitTarget<'_>, measured: Duration) {
        let sample = TimingSample::new(
            TimingKey::new(target.plan_id, target.step_id, target.action_kind),
            measured.as_secs_f64(),
        )
        .with_label(target.plan_label.map(str::to_string))
        .with_alpha(self.settings.alpha);

        if let Err(err) = self.store.update(&sample) {
            warn!(
                step_id = target.step_id,
                action_kind = target.action_kind,
                error = %err,
                "failed to record timing sample"
            );
        }
    }
}
