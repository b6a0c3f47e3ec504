//! Lock-free storage for the currently active evaluation engine. [`HandleStore`] is read by every
//! flag evaluation and written only by the refresher.
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::engine::{EvaluationEngine, UninitializedEngine};
use crate::ManagerLogger;

/// An evaluation engine together with the revision it was installed at.
///
/// Revision `0` is the placeholder served before any datafile has been accepted. Every swap
/// installs the next revision.
pub struct ActiveHandle {
    revision: u64,
    engine: Arc<dyn EvaluationEngine>,
}

impl ActiveHandle {
    /// Revision of this handle.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The engine serving evaluations.
    pub fn engine(&self) -> &Arc<dyn EvaluationEngine> {
        &self.engine
    }

    /// Returns `true` if the handle was built from a real datafile.
    pub fn is_ready(&self) -> bool {
        self.revision > 0
    }
}

/// `HandleStore` publishes one [`ActiveHandle`] at a time.
///
/// Reads never block: a reader gets either the previous or the new handle, never a partially
/// built one. A handle is always replaced as a whole.
pub(crate) struct HandleStore {
    active: ArcSwap<ActiveHandle>,
}

impl HandleStore {
    /// Create a store serving the uninitialized placeholder.
    pub fn new(logger: ManagerLogger) -> HandleStore {
        HandleStore {
            active: ArcSwap::from_pointee(ActiveHandle {
                revision: 0,
                engine: Arc::new(UninitializedEngine::new(logger)),
            }),
        }
    }

    /// Get the currently active handle.
    pub fn load(&self) -> Arc<ActiveHandle> {
        self.active.load_full()
    }

    /// Install `engine` as the next revision and return that revision.
    ///
    /// Must only be called from the refresher; concurrent writers could install revisions out of
    /// order.
    pub fn swap_in(&self, engine: Arc<dyn EvaluationEngine>) -> u64 {
        // Constructing new value before publishing it so readers only ever see complete handles.
        let revision = self.active.load().revision + 1;
        self.active.store(Arc::new(ActiveHandle { revision, engine }));
        revision
    }
}
