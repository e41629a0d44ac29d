//! Email delivery channel — SMTP via lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::debug;

use crate::error::NotifyError;

use super::dispatcher::DeliveryChannel;
use super::model::{ChannelKind, Notification};

/// SMTP configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct EmailDeliveryConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub subject_prefix: String,
}

impl EmailDeliveryConfig {
    /// Build config from environment variables.
    /// Returns `None` if `ONBOARD_SMTP_HOST` is not set (channel disabled).
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("ONBOARD_SMTP_HOST").ok()?;

        let smtp_port: u16 = std::env::var("ONBOARD_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("ONBOARD_SMTP_USERNAME").unwrap_or_default();
        let password = std::env::var("ONBOARD_SMTP_PASSWORD").unwrap_or_default();
        let from_address =
            std::env::var("ONBOARD_SMTP_FROM").unwrap_or_else(|_| username.clone());
        let subject_prefix = std::env::var("ONBOARD_SMTP_SUBJECT_PREFIX")
            .unwrap_or_else(|_| "[Onboarding]".to_string());

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
            subject_prefix,
        })
    }
}

/// Email leg of notification delivery.
///
/// Recipient ids that are not mailbox addresses (internal role members keyed
/// by user id) are skipped; their address book lives outside this subsystem.
pub struct EmailChannel {
    config: EmailDeliveryConfig,
}

impl EmailChannel {
    pub fn new(config: EmailDeliveryConfig) -> Self {
        Self { config }
    }

    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let delivery_err = |reason: String| NotifyError::Delivery {
            channel: "email".to_string(),
            recipient: to.to_string(),
            reason,
        };

        let email = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| delivery_err(format!("bad from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| delivery_err(format!("bad recipient address: {e}")))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| delivery_err(e.to_string()))?;

        let transport = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| delivery_err(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        transport
            .send(&email)
            .map(|_| ())
            .map_err(|e| delivery_err(e.to_string()))
    }
}

/// Whether a recipient id can be used as a mailbox address.
fn is_mailbox_address(recipient_id: &str) -> bool {
    recipient_id.contains('@') && !recipient_id.starts_with('@') && !recipient_id.ends_with('@')
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        if !is_mailbox_address(&notification.recipient_id) {
            debug!(
                recipient = %notification.recipient_id,
                "Recipient has no mailbox address, skipping email delivery"
            );
            return Ok(());
        }
        let subject = format!("{} {}", self.config.subject_prefix, notification.trigger);
        self.send_email(&notification.recipient_id, &subject, &notification.message)
    }
}
