//! Outbound mail transports.
//!
//! [`EmailProvider`] is the single capability the delivery layer depends on.
//! The concrete backend is picked once at startup from [`TransportConfig`].

mod emailjs;
mod scripted;
mod smtp;

pub use emailjs::{EMAILJS_SEND_URL, EmailJsProvider};
pub use scripted::ScriptedEmailProvider;
pub use smtp::SmtpProvider;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::templates::RenderedEmail;
use async_trait::async_trait;
use std::sync::Arc;

/// A rendered email addressed to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to_email: String,
    /// Display name; the local part of the address.
    pub to_name: String,
    pub rendered: RenderedEmail,
}

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentEmail {
    pub message_id: Option<String>,
}

impl SentEmail {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
        }
    }
}

/// One outbound channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Make exactly one delivery attempt.
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, TransportError>;

    /// Short lowercase name, also the key of the `/health` section.
    fn name(&self) -> &'static str;

    /// Configuration snapshot for `/health`. Never touches the network.
    fn health(&self) -> serde_json::Value;
}

/// Build the provider selected by configuration.
pub fn build_provider(config: TransportConfig) -> Result<Arc<dyn EmailProvider>, TransportError> {
    let provider: Arc<dyn EmailProvider> = match config {
        TransportConfig::Smtp(smtp) => Arc::new(SmtpProvider::new(smtp)?),
        TransportConfig::EmailJs(emailjs) => Arc::new(EmailJsProvider::new(emailjs)?),
    };

    tracing::info!(provider = provider.name(), "Mail transport ready");
    Ok(provider)
}
