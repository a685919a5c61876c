use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Browser launch settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromiumConfig {
    /// Explicit Chrome/Chromium binary; detected when unset.
    pub executable: Option<PathBuf>,
    pub user_data_dir: PathBuf,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Per-command DevTools timeout
    pub request_timeout_ms: u64,
    /// Attach to a running browser instead of launching one.
    pub websocket_url: Option<String>,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            executable: None,
            user_data_dir: default_profile_dir(),
            headless: resolve_headless_default(),
            window_width: 1366,
            window_height: 900,
            request_timeout_ms: 30_000,
            websocket_url: None,
        }
    }
}

fn resolve_headless_default() -> bool {
    // Headful unless STEPWRIGHT_HEADLESS is truthy.
    match env::var("STEPWRIGHT_HEADLESS") {
        Ok(value) => matches!(
            value.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

fn default_profile_dir() -> PathBuf {
    env::var("STEPWRIGHT_CHROME_PROFILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.stepwright-profile"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: ChromiumConfig =
            serde_json::from_str(r#"{"headless": true, "window_width": 800}"#).unwrap();
        assert!(cfg.headless);
        assert_eq!(cfg.window_width, 800);
        assert_eq!(cfg.window_height, 900);
        assert_eq!(cfg.request_timeout_ms, 30_000);
        assert!(cfg.websocket_url.is_none());
    }
}
