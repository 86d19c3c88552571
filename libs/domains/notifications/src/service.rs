//! Payment confirmation service: render, then deliver.

use crate::delivery::DeliveryOrchestrator;
use crate::error::NotificationResult;
use crate::models::{DeliveryResult, PaymentNotification};
use crate::providers::OutgoingEmail;
use crate::templates::TemplateEngine;
use tracing::info;

/// Sends payment confirmation emails.
pub struct NotificationService {
    templates: TemplateEngine,
    orchestrator: DeliveryOrchestrator,
}

impl NotificationService {
    pub fn new(templates: TemplateEngine, orchestrator: DeliveryOrchestrator) -> Self {
        Self {
            templates,
            orchestrator,
        }
    }

    /// Render and deliver the confirmation for one payment.
    pub async fn send_payment_confirmation(
        &self,
        notification: PaymentNotification,
    ) -> NotificationResult<DeliveryResult> {
        info!(
            to = %notification.recipient_email(),
            order_id = %notification.order_id(),
            "Sending payment confirmation email"
        );

        let rendered = self.templates.render_payment_confirmation(&notification)?;
        let email = OutgoingEmail {
            to_email: notification.recipient_email().to_string(),
            to_name: notification.recipient_name().to_string(),
            rendered,
        };

        Ok(self.orchestrator.deliver(&email).await?)
    }

    /// Transport name and its configuration snapshot.
    pub fn transport_health(&self) -> (&'static str, serde_json::Value) {
        let provider = self.orchestrator.provider();
        (provider.name(), provider.health())
    }
}
