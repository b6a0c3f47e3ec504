use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the datafile manager.
///
/// Only construction errors ([`Error::MissingSdkKey`], [`Error::InvalidPollInterval`],
/// [`Error::InvalidBaseUrl`], [`Error::Io`]) are ever returned to application code by
/// [`DatafileManager::configure`]. Errors that happen while polling are logged and recovered
/// inside the refresher.
///
/// [`DatafileManager::configure`]: crate::DatafileManager::configure
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// SDK key is empty.
    #[error("sdk_key is required")]
    MissingSdkKey,

    /// Poll interval is zero.
    #[error("poll_interval must be greater than zero")]
    InvalidPollInterval,

    /// The datafile URL could not be built from `base_url`.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// Transport failure or timeout while fetching the datafile.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),

    /// The datafile endpoint answered with a non-success status.
    #[error("unexpected response status: {0}")]
    UnexpectedStatus(StatusCode),

    /// The response body is not a JSON document.
    #[error("datafile is not valid JSON")]
    InvalidDatafile(#[source] Arc<serde_json::Error>),

    /// A flag was evaluated before any datafile has been accepted.
    #[error("datafile manager is not initialized yet")]
    Uninitialized,

    /// The evaluation engine refused to build from a datafile.
    #[error("failed to create evaluation engine: {0}")]
    EngineCreation(String),

    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    /// An I/O error, e.g. the refresher thread could not be spawned.
    #[error(transparent)]
    Io(Arc<std::io::Error>),

    /// The refresher thread was stopped before it accepted a datafile.
    #[error("refresher stopped before a datafile was accepted")]
    Stopped,

    /// The refresher thread panicked. This should normally never happen.
    #[error("refresher thread panicked")]
    RefresherThreadPanicked,
}

impl Error {
    /// Returns `true` for failures of a single fetch. The refresher skips the tick for these.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::UnexpectedStatus(_) | Error::InvalidDatafile(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        // The URL carries the SDK key, keep it out of logs.
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::InvalidDatafile(Arc::new(value))
    }
}
