//! Application configuration loaded from YAML

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use action_flow::{RunOptions, UnknownActionPolicy};
use action_gate::StaticConditionRegistry;
use action_primitives::WaitSettings;
use cdp_adapter::ChromiumConfig;
use serde::{Deserialize, Serialize};
use stepwright_timing_store::DEFAULT_ALPHA;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timing: TimingConfig,
    pub execution: ExecutionConfig,
    pub browser: ChromiumConfig,
    /// Condition key to expression, merged over the built-in registry
    pub conditions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// JSON timing document; timings stay in memory when unset
    pub store_path: Option<PathBuf>,
    pub default_ceiling_secs: f64,
    pub poll_interval_secs: f64,
    pub alpha: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            default_ceiling_secs: 5.0,
            poll_interval_secs: 0.5,
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub post_action_delay_ms: u64,
    pub max_recovery_attempts: u32,
    pub unknown_actions: UnknownActionPolicy,
    pub artifacts_dir: PathBuf,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            post_action_delay_ms: 1000,
            max_recovery_attempts: 3,
            unknown_actions: UnknownActionPolicy::Warn,
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

impl Config {
    pub fn wait_settings(&self) -> WaitSettings {
        let defaults = WaitSettings::default();
        WaitSettings {
            default_ceiling: secs_or(self.timing.default_ceiling_secs, defaults.default_ceiling),
            poll_interval: secs_or(self.timing.poll_interval_secs, defaults.poll_interval),
            alpha: alpha_or(self.timing.alpha, defaults.alpha),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            post_action_delay: Duration::from_millis(self.execution.post_action_delay_ms),
            max_recovery_attempts: self.execution.max_recovery_attempts,
            unknown_actions: self.execution.unknown_actions,
            artifacts_dir: self.execution.artifacts_dir.clone(),
        }
    }

    pub fn condition_registry(&self) -> StaticConditionRegistry {
        let mut registry = StaticConditionRegistry::with_defaults();
        registry.extend(self.conditions.clone());
        registry
    }
}

fn secs_or(secs: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|duration| !duration.is_zero())
        .unwrap_or(fallback)
}

fn alpha_or(alpha: f64, fallback: f64) -> f64 {
    if alpha > 0.0 && alpha <= 1.0 {
        alpha
    } else {
        warn!(alpha, fallback, "timing.alpha must be in (0, 1]; using default");
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_gate::ConditionRegistry;

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
timing:
  store_path: timings.json
  alpha: 0.5
execution:
  unknown_actions: reject
  post_action_delay_ms: 0
conditions:
  IS_ADULT: "IS_MINOR_TRUE == False"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.timing.store_path, Some(PathBuf::from("timings.json")));
        assert_eq!(config.timing.default_ceiling_secs, 5.0);

        let wait = config.wait_settings();
        assert_eq!(wait.default_ceiling, Duration::from_secs(5));
        assert_eq!(wait.poll_interval, Duration::from_millis(500));
        assert_eq!(wait.alpha, 0.5);

        let options = config.run_options();
        assert_eq!(options.unknown_actions, UnknownActionPolicy::Reject);
        assert!(options.post_action_delay.is_zero());
        assert_eq!(options.max_recovery_attempts, 3);

        let registry = config.condition_registry();
        assert_eq!(registry.lookup("IS_ADULT"), Some("IS_MINOR_TRUE == False"));
        assert!(registry.lookup("IS_MINOR_TRUE").is_some());
    }

    #[test]
    fn invalid_durations_fall_back() {
        let mut config = Config::default();
        config.timing.default_ceiling_secs = -1.0;
        config.timing.poll_interval_secs = f64::NAN;
        let wait = config.wait_settings();
        assert_eq!(wait.default_ceiling, Duration::from_secs(5));
        assert_eq!(wait.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn out_of_range_alpha_falls_back() {
        for alpha in [0.0, -0.3, 1.5, f64::NAN] {
            let mut config = Config::default();
            config.timing.alpha = alpha;
            assert_eq!(config.wait_settings().alpha, DEFAULT_ALPHA);
        }

        let mut config = Config::default();
        config.timing.alpha = 1.0;
        assert_eq!(config.wait_settings().alpha, 1.0);
    }
}
