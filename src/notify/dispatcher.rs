//! Notification dispatch — recipient resolution, record writes, and
//! fire-and-forget delivery.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::directory::RecipientResolver;
use crate::error::{Error, NotifyError};
use crate::store::Store;

use super::model::{
    ChannelKind, DeliveryEvent, DeliveryOutcome, Notification, NotificationTrigger, Recipients,
};

/// A concrete delivery transport (email, in-app push, ...).
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Deliver one notification to its recipient.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Resolves trigger events into per-recipient notification records and hands
/// them to the delivery channels.
///
/// Record writes are synchronous (they are part of the data model); delivery
/// runs on a spawned task and can never fail the triggering transition.
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    resolver: Arc<dyn RecipientResolver>,
    channels: Vec<Arc<dyn DeliveryChannel>>,
    events: broadcast::Sender<DeliveryEvent>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn Store>, resolver: Arc<dyn RecipientResolver>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store,
            resolver,
            channels: Vec::new(),
            events,
        }
    }

    /// Builder: attach a delivery channel.
    pub fn with_channel(mut self, channel: Arc<dyn DeliveryChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Subscribe to delivery outcomes (the observability hook).
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.events.subscribe()
    }

    /// Resolve `recipients`, write one notification per recipient, and spawn
    /// delivery on the hinted channels. Returns the written records.
    pub async fn send(
        &self,
        application_id: Uuid,
        trigger: NotificationTrigger,
        recipients: Recipients,
        message: &str,
        channels: &[ChannelKind],
    ) -> Result<Vec<Notification>, Error> {
        let ids = match recipients {
            Recipients::Users(ids) => ids,
            Recipients::Roles(roles) => self.resolver.resolve_roles(&roles).await?,
        };

        // Overlapping roles may resolve to the same user; one record each.
        let mut seen = std::collections::HashSet::new();
        let mut written = Vec::new();
        for recipient_id in ids {
            if !seen.insert(recipient_id.clone()) {
                continue;
            }
            let notification =
                Notification::new(application_id, recipient_id, trigger, message, channels);
            self.store.insert_notification(&notification).await?;
            written.push(notification);
        }

        debug!(
            application_id = %application_id,
            trigger = %trigger,
            recipients = written.len(),
            "Dispatching notifications"
        );
        self.spawn_delivery(written.clone());
        Ok(written)
    }

    /// Like [`send`](Self::send), but failures are logged instead of
    /// propagated. State transitions use this: notifications are best-effort
    /// side effects, never part of the transactional core.
    pub async fn notify(
        &self,
        application_id: Uuid,
        trigger: NotificationTrigger,
        recipients: Recipients,
        message: &str,
        channels: &[ChannelKind],
    ) {
        if let Err(e) = self
            .send(application_id, trigger, recipients, message, channels)
            .await
        {
            warn!(
                application_id = %application_id,
                trigger = %trigger,
                error = %e,
                "Failed to dispatch notification"
            );
        }
    }

    fn spawn_delivery(&self, notifications: Vec<Notification>) {
        if self.channels.is_empty() || notifications.is_empty() {
            return;
        }
        let channels = self.channels.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut deliveries = Vec::new();
            for notification in &notifications {
                for channel in &channels {
                    if notification.channels.contains(&channel.kind()) {
                        deliveries.push(deliver_one(
                            Arc::clone(channel),
                            notification.clone(),
                            events.clone(),
                        ));
                    }
                }
            }
            futures::future::join_all(deliveries).await;
        });
    }
}

/// One delivery attempt: log failures, report the outcome, swallow the error.
async fn deliver_one(
    channel: Arc<dyn DeliveryChannel>,
    notification: Notification,
    events: broadcast::Sender<DeliveryEvent>,
) {
    let outcome = match channel.deliver(&notification).await {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(e) => {
            warn!(
                notification_id = %notification.id,
                channel = %channel.kind(),
                recipient = %notification.recipient_id,
                error = %e,
                "Notification delivery failed"
            );
            DeliveryOutcome::Failed(e.to_string())
        }
    };
    let _ = events.send(DeliveryEvent {
        notification_id: notification.id,
        recipient_id: notification.recipient_id,
        channel: channel.kind(),
        outcome,
    });
}
