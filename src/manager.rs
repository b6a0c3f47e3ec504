use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::Level;

use crate::{
    engine::EngineFactory,
    fetcher::{DatafileFetcher, DatafileSource},
    handle_store::HandleStore,
    logger::manager_log,
    refresher::{FirstAccept, Refresher, RefresherThread},
    Client, Error, ManagerConfig, Result,
};

/// Owns the refresher thread and the [`Client`] it keeps up to date.
///
/// `DatafileManager` is a plain value: create one at application startup and keep it alive for as
/// long as flags are evaluated. Configuring it again replaces the previous client and stops the
/// previous refresher thread, so there is never more than one polling loop per manager.
///
/// # Examples
/// ```no_run
/// # use std::sync::Arc;
/// # use datafile_manager::{Datafile, DatafileManager, EngineOptions, EvaluationEngine, ManagerConfig, ManagerLogger, Result};
/// # fn create_engine(_: &Datafile, _: &ManagerLogger, _: &EngineOptions) -> Result<Arc<dyn EvaluationEngine>> { unimplemented!() }
/// let manager = DatafileManager::new();
/// manager.configure(ManagerConfig::from_sdk_key("sdk-key"), create_engine)?;
///
/// // Anywhere else in the application:
/// if let Some(client) = manager.client() {
///     let _enabled = client.evaluate_flag("new_checkout", Some("user-1"));
/// }
/// # Ok::<(), datafile_manager::Error>(())
/// ```
#[derive(Default)]
pub struct DatafileManager {
    instance: Mutex<Option<Instance>>,
}

struct Instance {
    client: Client,
    thread: RefresherThread,
}

impl DatafileManager {
    /// Create an unconfigured manager.
    pub fn new() -> DatafileManager {
        DatafileManager::default()
    }

    /// Start polling the datafile described by `config` and return the client serving it.
    ///
    /// Any previously configured instance is stopped and replaced. If configuration fails, the
    /// previous instance is left running.
    ///
    /// # Errors
    ///
    /// Fails immediately on invalid configuration:
    /// - [`Error::MissingSdkKey`]
    /// - [`Error::InvalidPollInterval`]
    /// - [`Error::InvalidBaseUrl`]
    /// - [`Error::Io`] if the refresher thread could not be spawned.
    pub fn configure(
        &self,
        config: ManagerConfig,
        factory: impl EngineFactory + 'static,
    ) -> Result<Client> {
        config.validate()?;
        let fetcher = DatafileFetcher::new(
            &config.base_url,
            &config.sdk_key,
            config.request_timeout,
            config.logger(),
        )?;
        self.configure_with_source(config, fetcher, factory)
    }

    /// Same as [`DatafileManager::configure`], but polls `source` instead of the HTTP endpoint.
    /// `base_url` and `request_timeout` from `config` are unused.
    pub fn configure_with_source(
        &self,
        config: ManagerConfig,
        source: impl DatafileSource + Send + 'static,
        factory: impl EngineFactory + 'static,
    ) -> Result<Client> {
        config.validate()?;
        let logger = config.logger();

        manager_log!(logger, Level::Debug, "loading datafile manager");

        let store = Arc::new(HandleStore::new(logger));
        let refresher = Refresher::new(
            Box::new(source),
            Arc::new(factory),
            config.engine_options,
            logger,
            store.clone(),
        );

        // The previous instance is replaced only once the new thread is running.
        let thread = RefresherThread::start(refresher, config.poll_interval)?;
        let client = Client::new(store, logger);

        let previous = self.lock().replace(Instance {
            client: client.clone(),
            thread,
        });
        // At most one polling loop per manager. An in-flight tick of the old loop only ever
        // writes to the old store.
        if let Some(previous) = previous {
            manager_log!(logger, Level::Debug, "replacing previously configured datafile manager");
            previous.thread.stop();
        }

        Ok(client)
    }

    /// The client of the current configuration. Returns `None` until [`DatafileManager::configure`]
    /// succeeds.
    pub fn client(&self) -> Option<Client> {
        self.lock().as_ref().map(|instance| instance.client.clone())
    }

    /// Block until the current configuration has accepted its first datafile.
    ///
    /// # Errors
    ///
    /// - [`Error::Uninitialized`] if the manager is not configured.
    /// - [`Error::RefresherThreadPanicked`] if the refresher thread died.
    pub fn wait_for_configuration(&self) -> Result<()> {
        match self.first_accept() {
            Some(first_accept) => first_accept.wait(),
            None => Err(Error::Uninitialized),
        }
    }

    /// Like [`DatafileManager::wait_for_configuration`], but gives up after `timeout`.
    ///
    /// Returns `Ok(false)` if no datafile was accepted in time or the manager is not configured.
    pub fn wait_for_configuration_timeout(&self, timeout: Duration) -> Result<bool> {
        match self.first_accept() {
            Some(first_accept) => first_accept.wait_timeout(timeout),
            None => Ok(false),
        }
    }

    // Waiting must not hold the manager lock, `configure` would block behind it.
    fn first_accept(&self) -> Option<Arc<FirstAccept>> {
        self.lock()
            .as_ref()
            .map(|instance| instance.thread.first_accept())
    }

    /// Stop the refresher thread and wait for it to exit. The manager becomes unconfigured;
    /// clients obtained earlier keep serving the last accepted datafile.
    pub fn shutdown(&self) -> Result<()> {
        let instance = self.lock().take();
        match instance {
            Some(instance) => instance.thread.shutdown(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instance>> {
        // The lock only guards swapping instances, which cannot leave them half-updated.
        match self.instance.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for DatafileManager {
    fn drop(&mut self) {
        if let Some(instance) = self.lock().take() {
            instance.thread.stop();
        }
    }
}
