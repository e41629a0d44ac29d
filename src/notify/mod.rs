//! Notification dispatch — triggers, records, and delivery channels.

pub mod dispatcher;
pub mod email;
pub mod inapp;
pub mod model;

pub use dispatcher::{DeliveryChannel, NotificationDispatcher};
pub use email::{EmailChannel, EmailDeliveryConfig};
pub use inapp::InAppChannel;
pub use model::{
    ChannelKind, DeliveryEvent, DeliveryOutcome, Notification, NotificationTrigger, Recipients,
};
