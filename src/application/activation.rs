//! Deferred activation — explicit, cancellable scheduled tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Tracks one pending activation per application.
///
/// Replaces an unstructured "activate later" timer: a scheduled activation
/// can be cancelled or observed deterministically from tests.
#[derive(Default)]
pub struct ActivationScheduler {
    pending: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl ActivationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `work` to run after `delay`. A previously scheduled
    /// activation for the same application is replaced.
    pub(crate) async fn schedule<F>(&self, application_id: Uuid, delay: Duration, work: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
            pending.lock().await.remove(&application_id);
        });

        if let Some(previous) = self.pending.lock().await.insert(application_id, handle) {
            previous.abort();
        }
    }

    /// Cancel a pending activation. Returns whether one was pending.
    pub async fn cancel(&self, application_id: Uuid) -> bool {
        match self.pending.lock().await.remove(&application_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether an activation is currently scheduled.
    pub async fn is_scheduled(&self, application_id: Uuid) -> bool {
        self.pending.lock().await.contains_key(&application_id)
    }
}
