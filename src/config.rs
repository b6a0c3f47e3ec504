use std::time::Duration;

use log::LevelFilter;
use serde_json::{Map, Value};

use crate::{
    engine::EngineFactory, manager::DatafileManager, Client, Error, ManagerLogger, Result,
};

/// Options passed verbatim to the [`EngineFactory`] every time an engine is created.
pub type EngineOptions = Map<String, Value>;

/// Configuration for [`DatafileManager`].
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use datafile_manager::ManagerConfig;
/// let config = ManagerConfig::from_sdk_key("sdk-key")
///     .log_level(log::LevelFilter::Info)
///     .poll_interval(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub(crate) sdk_key: String,
    pub(crate) base_url: String,
    pub(crate) log_level: LevelFilter,
    pub(crate) poll_interval: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) engine_options: EngineOptions,
}

impl ManagerConfig {
    /// Default base URL for datafile requests.
    pub const DEFAULT_BASE_URL: &'static str = "https://cdn.optimizely.com/datafiles";

    /// Default interval between datafile requests.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Default bound on a single datafile request.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a default configuration for the specified SDK key.
    ///
    /// ```
    /// # use datafile_manager::ManagerConfig;
    /// ManagerConfig::from_sdk_key("sdk-key");
    /// ```
    pub fn from_sdk_key(sdk_key: impl Into<String>) -> Self {
        ManagerConfig {
            sdk_key: sdk_key.into(),
            base_url: ManagerConfig::DEFAULT_BASE_URL.to_owned(),
            log_level: LevelFilter::Debug,
            poll_interval: ManagerConfig::DEFAULT_POLL_INTERVAL,
            request_timeout: ManagerConfig::DEFAULT_REQUEST_TIMEOUT,
            engine_options: EngineOptions::new(),
        }
    }

    /// Set manager log verbosity. Defaults to [`LevelFilter::Debug`].
    pub fn log_level(mut self, log_level: LevelFilter) -> Self {
        self.log_level = log_level;
        self
    }

    /// Override base URL for datafile requests. The datafile is requested from
    /// `{base_url}/{sdk_key}.json`. Clients should use the default setting in most cases.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the fixed interval between datafile requests. Must be greater than zero.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the timeout of a single datafile request.
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Set options forwarded to the evaluation engine factory.
    ///
    /// ```
    /// # use datafile_manager::{EngineOptions, ManagerConfig};
    /// let mut options = EngineOptions::new();
    /// options.insert("skipJsonValidation".to_owned(), true.into());
    /// ManagerConfig::from_sdk_key("sdk-key").engine_options(options);
    /// ```
    pub fn engine_options(mut self, engine_options: EngineOptions) -> Self {
        self.engine_options = engine_options;
        self
    }

    /// SDK key identifying the datafile.
    pub fn sdk_key(&self) -> &str {
        &self.sdk_key
    }

    pub(crate) fn logger(&self) -> ManagerLogger {
        ManagerLogger::new(self.log_level)
    }

    /// Fail fast on programmer errors.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.sdk_key.trim().is_empty() {
            return Err(Error::MissingSdkKey);
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidPollInterval);
        }
        Ok(())
    }

    /// Configure a new [`DatafileManager`] and return its client.
    ///
    /// Shorthand for [`DatafileManager::new`] followed by [`DatafileManager::configure`].
    pub fn to_manager(
        self,
        factory: impl EngineFactory + 'static,
    ) -> Result<(DatafileManager, Client)> {
        let manager = DatafileManager::new();
        let client = manager.configure(self, factory)?;
        Ok((manager, client))
    }
}
