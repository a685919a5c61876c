use std::env;
use std::path::PathBuf;

use which::which;

/// Locate a Chrome/Chromium binary: `STEPWRIGHT_CHROME`, then `PATH`, then
/// the usual install locations.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("STEPWRIGHT_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("STEPWRIGHT_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if skip_defaults {
        return None;
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .map(|root| PathBuf::from(root.trim()))
            .flat_map(|root| {
                [
                    root.join("Google/Chrome/Application/chrome.exe"),
                    root.join("Chromium/Application/chrome.exe"),
                    root.join("Microsoft/Edge/Application/msedge.exe"),
                ]
            })
            .collect()
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    // Both cases mutate process environment, so they run in one test.
    #[test]
    fn detects_from_env_var_then_path() {
        let original_env = env::var("STEPWRIGHT_CHROME").ok();
        let original_path = env::var("PATH").ok();
        let skip_flag = env::var("STEPWRIGHT_SKIP_OS_PATHS").ok();

        let dir = tempdir().unwrap();
        let explicit = dir.path().join("my-chrome");
        fs::write(&explicit, b"").unwrap();
        env::set_var("STEPWRIGHT_CHROME", &explicit);
        let from_env = detect_chrome_executable();

        let bin_dir = tempdir().unwrap();
        let on_path = bin_dir.path().join(chrome_executable_names()[0]);
        fs::write(&on_path, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&on_path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        env::set_var("STEPWRIGHT_CHROME", "");
        env::set_var("STEPWRIGHT_SKIP_OS_PATHS", "1");
        env::set_var("PATH", bin_dir.path());
        let from_path = detect_chrome_executable();

        match original_env {
            Some(value) => env::set_var("STEPWRIGHT_CHROME", value),
            None => env::remove_var("STEPWRIGHT_CHROME"),
        }
        match original_path {
            Some(value) => env::set_var("PATH", value),
            None => env::remove_var("PATH"),
        }
        match skip_flag {
            Some(value) => env::set_var("STEPWRIGHT_SKIP_OS_PATHS", value),
            None => env::remove_var("STEPWRIGHT_SKIP_OS_PATHS"),
        }

        assert_eq!(from_env, Some(explicit));
        assert_eq!(from_path, Some(on_path));
    }
}
