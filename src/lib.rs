//! Keeps a feature flag evaluation engine in sync with a remotely hosted datafile.
//!
//! # Overview
//!
//! A [`DatafileManager`] polls `{base_url}/{sdk_key}.json` at a fixed interval on a background
//! thread. Whenever the fetched datafile differs structurally from the last accepted one, a new
//! [`EvaluationEngine`] is built through the application-provided [`EngineFactory`] and atomically
//! swapped in. Application code evaluates flags through a [`Client`], which always answers from
//! the engine that is current at call time.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use datafile_manager::{Datafile, EngineOptions, EvaluationEngine, ManagerConfig, ManagerLogger, Result};
//! # fn create_engine(_: &Datafile, _: &ManagerLogger, _: &EngineOptions) -> Result<Arc<dyn EvaluationEngine>> { unimplemented!() }
//! let (manager, client) = ManagerConfig::from_sdk_key("sdk-key").to_manager(create_engine)?;
//!
//! // Optional: block until the first datafile arrives.
//! manager.wait_for_configuration()?;
//!
//! if client.evaluate_flag("new_checkout", Some("user-1")) {
//!     // ...
//! }
//! # Ok::<(), datafile_manager::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! Only misconfiguration (missing SDK key, invalid base URL) is reported to the caller. Failed
//! fetches are logged and retried on the next poll, and evaluating a flag before the first
//! datafile is accepted logs an error and reports the flag as disabled.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `datafile_manager` target. Verbosity can additionally be limited per manager with
//! [`ManagerConfig::log_level`].

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

pub mod change;
mod client;
mod config;
mod datafile;
mod engine;
mod error;
mod fetcher;
mod handle_store;
mod logger;
mod manager;
mod refresher;

pub use client::Client;
pub use config::{EngineOptions, ManagerConfig};
pub use datafile::Datafile;
pub use engine::{EngineFactory, EvaluationEngine};
pub use error::{Error, Result};
pub use fetcher::{datafile_url, DatafileFetcher, DatafileSource};
pub use handle_store::ActiveHandle;
pub use logger::ManagerLogger;
pub use manager::DatafileManager;
