use std::sync::Arc;

use log::Level;
use rand::{thread_rng, Rng};

use crate::{
    handle_store::{ActiveHandle, HandleStore},
    logger::{manager_log, ManagerLogger},
    Error, Result,
};

/// Evaluates feature flags against the currently active datafile.
///
/// A `Client` is obtained from [`DatafileManager::configure`](crate::DatafileManager::configure)
/// or [`DatafileManager::client`](crate::DatafileManager::client). It is cheap to clone and can
/// be shared between threads; all clones observe the same datafile updates.
///
/// Evaluation never fails: before the first datafile is accepted every flag is reported as
/// disabled and an error is logged.
#[derive(Clone)]
pub struct Client {
    store: Arc<HandleStore>,
    logger: ManagerLogger,
}

impl Client {
    pub(crate) fn new(store: Arc<HandleStore>, logger: ManagerLogger) -> Client {
        Client { store, logger }
    }

    /// Returns `true` if `flag_key` is enabled for `user_id`.
    ///
    /// If `user_id` is `None` or empty, a random user id is generated for this call only. Random
    /// ids are not persisted, so the same flag may evaluate differently on every call; always pass
    /// a stable user id in production.
    pub fn evaluate_flag(&self, flag_key: &str, user_id: Option<&str>) -> bool {
        let user_id = self.user_id_or_random(flag_key, user_id);
        self.store
            .load()
            .engine()
            .is_feature_enabled(flag_key, &user_id)
    }

    /// Same as [`Client::evaluate_flag`], but returns [`Error::Uninitialized`] instead of `false`
    /// while no datafile has been accepted yet.
    pub fn try_evaluate_flag(&self, flag_key: &str, user_id: Option<&str>) -> Result<bool> {
        let handle = self.store.load();
        if !handle.is_ready() {
            return Err(Error::Uninitialized);
        }
        let user_id = self.user_id_or_random(flag_key, user_id);
        Ok(handle.engine().is_feature_enabled(flag_key, &user_id))
    }

    /// Returns `true` once a datafile has been accepted.
    pub fn is_ready(&self) -> bool {
        self.store.load().is_ready()
    }

    /// Revision of the active engine. `0` until the first datafile is accepted, incremented on
    /// every datafile change.
    pub fn revision(&self) -> u64 {
        self.store.load().revision()
    }

    /// Snapshot of the active engine. Holding the snapshot does not prevent updates.
    pub fn active_handle(&self) -> Arc<ActiveHandle> {
        self.store.load()
    }

    fn user_id_or_random(&self, flag_key: &str, user_id: Option<&str>) -> String {
        match user_id {
            Some(user_id) if !user_id.is_empty() => user_id.to_owned(),
            _ => {
                let user_id = thread_rng().gen::<f64>().to_string();
                manager_log!(self.logger, Level::Info, flag_key, user_id = user_id.as_str();
                             "no user id passed to evaluate_flag, using random user id '{}' instead", user_id);
                user_id
            }
        }
    }
}
