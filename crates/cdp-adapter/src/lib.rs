//! Chromium backend for [`action_primitives::BrowserDriver`].
//!
//! Launches (or attaches to) a Chromium instance over the DevTools protocol
//! and drives a single page. Element operations resolve locators with
//! CSS or XPath lookups; state checks and value edits go through small
//! page scripts.

pub mod config;
mod detect;
pub mod driver;
pub mod error;
mod scripts;

pub use config::ChromiumConfig;
pub use detect::detect_chrome_executable;
pub use driver::ChromiumDriver;
pub use error::AdapterError;
