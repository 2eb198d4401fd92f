//! Outbound email delivery.
//!
//! The `EmailGateway` trait is the seam between orchestration and the SMTP
//! relay; production uses `SmtpGateway` over lettre, tests substitute a
//! recording double.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

/// Errors from the email gateway.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A recipient or sender address did not parse.
    #[error("invalid email address: {0}")]
    Address(String),

    /// The message itself could not be built.
    #[error("failed to build message: {0}")]
    Message(String),

    /// The SMTP relay rejected or never received the message.
    #[error("smtp transport failed: {0}")]
    Transport(String),
}

/// Connection settings for the SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Sends one rendered email to one recipient.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError>;
}

/// SMTP gateway over a STARTTLS relay connection.
pub struct SmtpGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpGateway {
    /// Builds the transport. Connections are established lazily per send.
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailGateway for SmtpGateway {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
        let from = self
            .from
            .parse()
            .map_err(|_| DeliveryError::Address(self.from.clone()))?;
        let to_mailbox = to
            .parse()
            .map_err(|_| DeliveryError::Address(to.to_string()))?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| DeliveryError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp-relay.brevo.com".to_string(),
            port: 587,
            username: "key".to_string(),
            password: "secret".to_string(),
            from: "notifications@taskboard.local".to_string(),
        }
    }

    #[test]
    fn test_gateway_builds() {
        assert!(SmtpGateway::new(&config()).is_ok());
    }

    #[tokio::test]
    async fn test_bad_recipient_address_rejected() {
        let gateway = SmtpGateway::new(&config()).unwrap();
        let err = gateway.send("not-an-address", "s", "<p>b</p>").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Address(_)));
    }
}
