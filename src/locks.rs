//! Per-application lock registry.
//!
//! Every public engine operation holds the owning application's lock for its
//! read-modify-write section, including sibling-task accepts for the same
//! application.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Lazily-populated map of per-application mutexes.
#[derive(Default)]
pub struct ApplicationLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ApplicationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one application. The guard is owned, so it can be
    /// held across awaits and moved into scheduled tasks.
    pub async fn lock(&self, application_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(application_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
