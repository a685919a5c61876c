use action_primitives::DriverError;
use thiserror::Error;

/// Failures while starting or attaching to the browser.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("chrome executable not found; set STEPWRIGHT_CHROME or browser.executable")]
    ExecutableNotFound,

    #[error("invalid browser configuration: {0}")]
    Config(String),

    #[error("failed to launch browser: {0}")]
    Launch(#[source] chromiumoxide::error::CdpError),

    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },

    #[error("failed to open page: {0}")]
    Page(#[source] chromiumoxide::error::CdpError),
}

pub(crate) fn protocol(err: chromiumoxide::error::CdpError) -> DriverError {
    DriverError::Protocol(err.to_string())
}
