//! # Registry: index of live timers.
//!
//! The registry is an explicit cache over the canonical store — it maps
//! each id to the handle of a timer whose actor task exists right now.
//! Entries appear through registration (start, restore, lazy lookup) and
//! disappear through cancellation, the reaper, or a shutdown drain.
//!
//! ## Rules
//! - [`Registry::try_register`] runs the caller's construction future
//!   under the write lock, so the duplicate check, the initial store
//!   write, and the insert form one registration step.
//! - Lookups on distinct ids never contend with countdown progress; the
//!   lock guards only the map.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ServiceError;
use crate::timers::Timer;

/// In-memory id → handle index of currently live timers.
#[derive(Default)]
pub(crate) struct Registry {
    timers: RwLock<HashMap<u64, Arc<Timer>>>,
}

impl Registry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the live handle for `id`, if any.
    pub(crate) async fn get(&self, id: u64) -> Option<Arc<Timer>> {
        self.timers.read().await.get(&id).cloned()
    }

    /// Registers the timer produced by `make`, holding the write lock for
    /// the whole step. Fails `AlreadyExists` when the id is already live;
    /// when `make` fails nothing is inserted.
    pub(crate) async fn try_register<F, Fut>(
        &self,
        id: u64,
        make: F,
    ) -> Result<Arc<Timer>, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<Timer>, ServiceError>>,
    {
        let mut timers = self.timers.write().await;
        if timers.contains_key(&id) {
            return Err(ServiceError::AlreadyExists);
        }
        let timer = make().await?;
        timers.insert(id, Arc::clone(&timer));
        Ok(timer)
    }

    /// Removes and returns the handle for `id`.
    pub(crate) async fn remove(&self, id: u64) -> Option<Arc<Timer>> {
        self.timers.write().await.remove(&id)
    }

    /// Empties the registry, returning every live handle.
    pub(crate) async fn drain(&self) -> Vec<Arc<Timer>> {
        self.timers.write().await.drain().map(|(_, t)| t).collect()
    }

    /// Sorted ids of all live timers.
    pub(crate) async fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.timers.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
