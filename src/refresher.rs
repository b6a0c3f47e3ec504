//! Periodic datafile refresh.
//!
//! [`Refresher`] runs a single poll ("tick"): fetch, compare with the last accepted datafile,
//! and on change build a new engine and swap it in. [`RefresherThread`] drives ticks on a
//! background thread at a fixed interval.
use std::{
    sync::{mpsc::RecvTimeoutError, Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use log::Level;

use crate::{
    change::has_changed,
    engine::EngineFactory,
    fetcher::DatafileSource,
    handle_store::HandleStore,
    logger::{manager_log, ManagerLogger},
    Datafile, EngineOptions, Error, Result,
};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new engine was installed at `revision`.
    Updated {
        /// Revision of the installed handle.
        revision: u64,
    },
    /// The fetched datafile equals the last accepted one.
    Unchanged,
    /// The datafile could not be fetched. Nothing changed.
    FetchFailed,
    /// The engine could not be built from a changed datafile. Nothing changed; the datafile will
    /// be retried on the next tick.
    EngineFailed,
}

/// Owns the refresh state and performs ticks.
///
/// `Refresher` is not shared: ticks are serialized by construction as they need `&mut self`.
pub(crate) struct Refresher {
    source: Box<dyn DatafileSource + Send>,
    factory: Arc<dyn EngineFactory>,
    options: EngineOptions,
    logger: ManagerLogger,
    store: Arc<HandleStore>,
    /// Last datafile an engine was successfully built from.
    last_accepted: Option<Datafile>,
}

impl Refresher {
    pub fn new(
        source: Box<dyn DatafileSource + Send>,
        factory: Arc<dyn EngineFactory>,
        options: EngineOptions,
        logger: ManagerLogger,
        store: Arc<HandleStore>,
    ) -> Refresher {
        Refresher {
            source,
            factory,
            options,
            logger,
            store,
            last_accepted: None,
        }
    }

    /// Run one poll. Never fails: errors are logged and leave the active engine untouched.
    pub fn tick(&mut self) -> TickOutcome {
        let candidate = match self.source.fetch() {
            Ok(datafile) => datafile,
            Err(err) => {
                manager_log!(self.logger, Level::Warn,
                             "failed to fetch datafile, keeping current configuration: {}", err);
                return TickOutcome::FetchFailed;
            }
        };

        if !has_changed(self.last_accepted.as_ref(), &candidate, &self.logger) {
            manager_log!(self.logger, Level::Trace, "datafile unchanged");
            return TickOutcome::Unchanged;
        }

        manager_log!(self.logger, Level::Debug,
                     datafile_revision = candidate.revision();
                     "received an updated datafile, re-creating evaluation engine");

        let engine = match self.factory.create(&candidate, &self.logger, &self.options) {
            Ok(engine) => engine,
            Err(err) => {
                manager_log!(self.logger, Level::Warn,
                             "failed to create evaluation engine from datafile: {}", err);
                return TickOutcome::EngineFailed;
            }
        };

        let revision = self.store.swap_in(engine);
        self.last_accepted = Some(candidate);

        manager_log!(self.logger, Level::Debug, revision; "installed new evaluation engine");

        TickOutcome::Updated { revision }
    }
}

/// Outcome of waiting for the first accepted datafile.
///
/// Holds `None` until the first datafile has been accepted, `Some(Ok(()))` after that. Holds
/// `Some(Err(...))` if the refresher thread was stopped or died before accepting one. The first
/// outcome sticks.
#[derive(Default)]
pub(crate) struct FirstAccept {
    result: Mutex<Option<Result<()>>>,
    condvar: Condvar,
}

impl FirstAccept {
    fn set(&self, value: Result<()>) {
        let mut slot = match self.result.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            *slot = Some(value);
            self.condvar.notify_all();
        }
    }

    /// Block until the first outcome is known.
    pub fn wait(&self) -> Result<()> {
        let mut lock = self
            .result
            .lock()
            .map_err(|_| Error::RefresherThreadPanicked)?;
        loop {
            match &*lock {
                Some(result) => {
                    // The refresher has already accepted a datafile (or died).
                    return result.clone();
                }
                None => {
                    lock = self
                        .condvar
                        .wait(lock)
                        .map_err(|_| Error::RefresherThreadPanicked)?;
                }
            }
        }
    }

    /// Like [`FirstAccept::wait`], but returns `Ok(false)` if nothing happened within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        let lock = self
            .result
            .lock()
            .map_err(|_| Error::RefresherThreadPanicked)?;
        let (lock, _) = self
            .condvar
            .wait_timeout_while(lock, timeout, |result| result.is_none())
            .map_err(|_| Error::RefresherThreadPanicked)?;

        match &*lock {
            Some(result) => result.clone().map(|()| true),
            None => Ok(false),
        }
    }
}

/// A background thread running [`Refresher`] ticks at a fixed interval.
///
/// Ticks never overlap. If a tick takes longer than the interval, the ticks it overran are
/// skipped and the next one starts right away. Dropping the handle stops the thread after its
/// current tick.
pub(crate) struct RefresherThread {
    join_handle: std::thread::JoinHandle<()>,

    /// Used to send a stop command to the refresher thread.
    stop_sender: std::sync::mpsc::SyncSender<()>,

    first_accept: Arc<FirstAccept>,
}

impl RefresherThread {
    pub fn start(mut refresher: Refresher, interval: Duration) -> Result<RefresherThread> {
        // Buffer of 1 is enough: a second stop command can be dropped with `try_send()`.
        let (stop_sender, stop_receiver) = std::sync::mpsc::sync_channel::<()>(1);

        let first_accept = Arc::new(FirstAccept::default());

        let join_handle = {
            // Cloning Arc for move into thread
            let first_accept = Arc::clone(&first_accept);

            std::thread::Builder::new()
                .name("datafile-refresher".to_owned())
                .spawn(move || {
                    let logger = refresher.logger;
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| loop {
                        let started = Instant::now();

                        if let TickOutcome::Updated { .. } = refresher.tick() {
                            first_accept.set(Ok(()));
                        }

                        let elapsed = started.elapsed();
                        if elapsed > interval {
                            manager_log!(logger, Level::Debug,
                                         elapsed_ms = elapsed.as_millis() as u64;
                                         "datafile poll took longer than the poll interval, skipping missed ticks");
                        }

                        match stop_receiver.recv_timeout(interval.saturating_sub(elapsed)) {
                            Err(RecvTimeoutError::Timeout) => {
                                // Timed out. Loop back to fetch the datafile again.
                            }
                            Ok(()) => {
                                manager_log!(logger, Level::Debug, "refresher thread received stop command");
                                return;
                            }
                            Err(RecvTimeoutError::Disconnected) => {
                                // The owner is gone, nobody can read our updates anymore.
                                manager_log!(logger, Level::Debug, "refresher thread disconnected");
                                return;
                            }
                        }
                    }));

                    // No-op if a datafile was accepted before the thread exited.
                    match outcome {
                        Ok(()) => first_accept.set(Err(Error::Stopped)),
                        Err(_) => first_accept.set(Err(Error::RefresherThreadPanicked)),
                    }
                })?
        };

        Ok(RefresherThread {
            join_handle,
            stop_sender,
            first_accept,
        })
    }

    /// Shared handle to wait for the first accepted datafile without holding on to the thread.
    pub fn first_accept(&self) -> Arc<FirstAccept> {
        Arc::clone(&self.first_accept)
    }

    /// Stop the refresher thread.
    ///
    /// This function does not wait for the thread to actually stop. An in-flight fetch is not
    /// cancelled; the thread exits once it completes. Waiters for the first datafile are released
    /// with [`Error::Stopped`] right away.
    pub fn stop(&self) {
        self.first_accept.set(Err(Error::Stopped));

        // Error means that the receiver was dropped (thread exited) or the buffer is full
        // (another stop command is pending). Either way the thread is stopping.
        let _ = self.stop_sender.try_send(());
    }

    /// Stop the refresher thread and block waiting for it to exit.
    pub fn shutdown(self) -> Result<()> {
        // Send stop signal in case it wasn't sent before.
        self.stop();

        self.join_handle
            .join()
            .map_err(|_| Error::RefresherThreadPanicked)?;

        Ok(())
    }
}
