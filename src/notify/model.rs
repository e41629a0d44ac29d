//! Notification data model, triggers, and recipient specs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::Role;

/// The named event that caused a notification to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTrigger {
    BusinessSignup,
    SubscriptionConfirmed,
    ReadyForReview,
    ReviewTasksCreated,
    ReviewAccepted,
    ApplicationApproved,
    ApplicationRejected,
    AccountActivated,
}

impl std::fmt::Display for NotificationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BusinessSignup => "business_signup",
            Self::SubscriptionConfirmed => "subscription_confirmed",
            Self::ReadyForReview => "ready_for_review",
            Self::ReviewTasksCreated => "review_tasks_created",
            Self::ReviewAccepted => "review_accepted",
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationRejected => "application_rejected",
            Self::AccountActivated => "account_activated",
        };
        write!(f, "{s}")
    }
}

/// Who a notification goes to: explicit user ids, or a role set resolved
/// against the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipients {
    Users(Vec<String>),
    Roles(Vec<Role>),
}

impl Recipients {
    /// Convenience: a single explicit user.
    pub fn user(id: impl Into<String>) -> Self {
        Self::Users(vec![id.into()])
    }

    /// Convenience: a role set.
    pub fn roles(roles: impl Into<Vec<Role>>) -> Self {
        Self::Roles(roles.into())
    }
}

/// Delivery channel hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    InApp,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Email => "email",
            Self::InApp => "in_app",
        };
        write!(f, "{s}")
    }
}

/// A persisted notification for one recipient.
///
/// Write-once; only `is_read` may be flipped afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique ID.
    pub id: Uuid,
    /// The application this notification belongs to.
    pub application_id: Uuid,
    /// Concrete recipient (already resolved from the recipient spec).
    pub recipient_id: String,
    pub trigger: NotificationTrigger,
    /// Rendered human-readable message.
    pub message: String,
    /// Channels this notification should be delivered on.
    pub channels: Vec<ChannelKind>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        application_id: Uuid,
        recipient_id: impl Into<String>,
        trigger: NotificationTrigger,
        message: impl Into<String>,
        channels: &[ChannelKind],
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id,
            recipient_id: recipient_id.into(),
            trigger,
            message: message.into(),
            channels: channels.to_vec(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Observability event emitted for every delivery attempt.
///
/// This is the only place delivery failures surface; they never unwind the
/// transition that triggered the notification.
#[derive(Debug, Clone)]
pub struct DeliveryEvent {
    pub notification_id: Uuid,
    pub recipient_id: String,
    pub channel: ChannelKind,
    pub outcome: DeliveryOutcome,
}
