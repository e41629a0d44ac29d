//! In-app delivery channel — broadcast to connected UI clients.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::NotifyError;

use super::dispatcher::DeliveryChannel;
use super::model::{ChannelKind, Notification};

/// Pushes notifications to in-process subscribers (the browser/UI leg).
///
/// Delivering with no subscribers connected is not a failure; the record is
/// already persisted and shows up on the recipient's next fetch.
pub struct InAppChannel {
    tx: broadcast::Sender<Notification>,
}

impl InAppChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribe to live notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for InAppChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryChannel for InAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::InApp
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let _ = self.tx.send(notification.clone());
        Ok(())
    }
}
