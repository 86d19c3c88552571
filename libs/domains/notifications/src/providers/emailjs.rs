//! EmailJS REST API provider.
//!
//! The provider-side template does the rendering; we forward the rendered
//! HTML as `message` plus the individual display fields.

use super::{EmailProvider, OutgoingEmail, SentEmail};
use crate::config::EmailJsConfig;
use crate::error::{TransportError, TransportErrorKind, io_error_kind, is_connection_reset};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

/// Public EmailJS send endpoint.
pub const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Per-request ceiling, short enough that a retry still fits in the
/// delivery deadline.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken")]
    access_token: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    to_name: &'a str,
    subject: &'a str,
    message: &'a str,
    order_id: &'a str,
    total_amount: &'a str,
    raw_amount: f64,
    transaction_id: &'a str,
    payment_date: &'a str,
    payment_method: &'a str,
    order_status: &'a str,
}

/// EmailJS HTTP API provider.
pub struct EmailJsProvider {
    client: Client,
    config: EmailJsConfig,
}

impl EmailJsProvider {
    pub fn new(config: EmailJsConfig) -> Result<Self, TransportError> {
        Self::with_timeout(config, HTTP_TIMEOUT)
    }

    /// Provider whose HTTP requests give up after `timeout`.
    pub fn with_timeout(config: EmailJsConfig, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            api_url = %config.api_url,
            configured = config.is_configured(),
            timeout_ms = timeout.as_millis() as u64,
            "EmailJS transport initialized"
        );

        Ok(Self { client, config })
    }
}

/// Map a non-2xx EmailJS answer to a transport error.
fn classify_status(status: StatusCode, body: &str) -> TransportError {
    let body = body.trim();
    let (kind, message) = match status {
        StatusCode::BAD_REQUEST => (
            TransportErrorKind::Configuration,
            format!("EmailJS configuration error: {}", body),
        ),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => (
            TransportErrorKind::Authentication,
            "EmailJS authentication failed. Check EMAILJS_PUBLIC_KEY and EMAILJS_PRIVATE_KEY"
                .to_string(),
        ),
        StatusCode::NOT_FOUND => (
            TransportErrorKind::UnknownResource,
            "EmailJS service or template not found. Check EMAILJS_SERVICE_ID and EMAILJS_TEMPLATE_ID"
                .to_string(),
        ),
        _ => (
            TransportErrorKind::Rejected,
            format!("EmailJS API error ({}): {}", status.as_u16(), body),
        ),
    };
    TransportError::new(kind, message)
}

fn classify_request_error(err: &reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if io_error_kind(err).is_some_and(is_connection_reset) {
        TransportErrorKind::ConnectionReset
    } else {
        TransportErrorKind::Internal
    };
    TransportError::new(kind, format!("EmailJS request failed: {}", err))
}

#[async_trait]
impl EmailProvider for EmailJsProvider {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, TransportError> {
        let (Some(service_id), Some(template_id), Some(public_key), Some(private_key)) = (
            self.config.service_id.as_deref(),
            self.config.template_id.as_deref(),
            self.config.public_key.as_deref(),
            self.config.private_key.as_deref(),
        ) else {
            return Err(TransportError::configuration(
                "EmailJS is not configured (EMAILJS_SERVICE_ID, EMAILJS_TEMPLATE_ID, EMAILJS_PUBLIC_KEY, EMAILJS_PRIVATE_KEY)",
            ));
        };

        let fields = &email.rendered.fields;
        let request = SendRequest {
            service_id,
            template_id,
            user_id: public_key,
            access_token: private_key,
            template_params: TemplateParams {
                to_email: &email.to_email,
                to_name: &email.to_name,
                subject: &email.rendered.subject,
                message: &email.rendered.html,
                order_id: &fields.order_id,
                total_amount: &fields.total_amount,
                raw_amount: fields.raw_amount,
                transaction_id: &fields.transaction_id,
                payment_date: &fields.payment_date,
                payment_method: fields.payment_method,
                order_status: fields.order_status,
            },
        };

        debug!(to = %email.to_email, order_id = %fields.order_id, "Sending email via EmailJS");

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let err = classify_request_error(&e);
                error!(to = %email.to_email, kind = %err.kind, error = %e, "EmailJS request failed");
                err
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(&e))?;

        if status.is_success() {
            info!(to = %email.to_email, response = %body, "Email sent successfully via EmailJS");
            Ok(SentEmail::new(body))
        } else {
            let err = classify_status(status, &body);
            error!(
                to = %email.to_email,
                status = status.as_u16(),
                kind = %err.kind,
                body = %body,
                "EmailJS API error"
            );
            Err(err)
        }
    }

    fn name(&self) -> &'static str {
        "emailjs"
    }

    fn health(&self) -> serde_json::Value {
        json!({
            "configured": self.config.is_configured(),
            "serviceId": self.config.service_id,
            "templateId": self.config.template_id,
        })
    }
}
