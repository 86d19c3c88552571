//! Data models for the notifications domain.

use crate::error::{NotificationError, NotificationResult, TransportError, TransportErrorKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

/// Basic email shape: something@something.something, no whitespace.
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Check an address against the basic email shape.
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_SHAPE.is_match(address)
}

// ============================================================================
// Request DTO
// ============================================================================

/// Body of `POST /api/send-payment-email`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPaymentEmailRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_date: Option<String>,
}

/// Success body of `POST /api/send-payment-email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPaymentEmailResponse {
    pub success: bool,
    pub message: String,
    pub order_id: String,
}

impl SendPaymentEmailResponse {
    pub fn sent(order_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message: "Email sent successfully".to_string(),
            order_id: order_id.into(),
        }
    }
}

/// Accepts `"42"` and `42` alike; checkout clients send both.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}

/// Parse the loosely-typed `paymentDate` field.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare
/// `YYYY-MM-DD`. Returns `None` for anything else.
pub fn parse_payment_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Domain model
// ============================================================================

/// A validated request to confirm a payment by email.
///
/// Only constructible through [`PaymentNotification::new`] or
/// [`TryFrom<SendPaymentEmailRequest>`], so every instance has a well-formed
/// recipient and a non-empty order id.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotification {
    recipient_email: String,
    order_id: String,
    total_amount: Option<f64>,
    transaction_id: Option<String>,
    payment_date: Option<DateTime<Utc>>,
}

impl PaymentNotification {
    pub fn new(
        recipient_email: impl Into<String>,
        order_id: impl Into<String>,
    ) -> NotificationResult<Self> {
        let recipient_email = recipient_email.into();
        let order_id = order_id.into().trim().to_string();

        if recipient_email.is_empty() || order_id.is_empty() {
            return Err(NotificationError::Validation(
                "Missing required fields: to and orderId are required".to_string(),
            ));
        }
        if !is_valid_email(&recipient_email) {
            return Err(NotificationError::Validation(
                "Invalid email format".to_string(),
            ));
        }

        Ok(Self {
            recipient_email,
            order_id,
            total_amount: None,
            transaction_id: None,
            payment_date: None,
        })
    }

    pub fn with_total_amount(mut self, total_amount: Option<f64>) -> Self {
        self.total_amount = total_amount.filter(|amount| amount.is_finite());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: Option<String>) -> Self {
        self.transaction_id = transaction_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        self
    }

    pub fn with_payment_date(mut self, payment_date: Option<DateTime<Utc>>) -> Self {
        self.payment_date = payment_date;
        self
    }

    pub fn recipient_email(&self) -> &str {
        &self.recipient_email
    }

    /// Local part of the recipient address, used as the display name.
    pub fn recipient_name(&self) -> &str {
        self.recipient_email
            .split('@')
            .next()
            .unwrap_or(&self.recipient_email)
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn total_amount(&self) -> Option<f64> {
        self.total_amount
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.payment_date
    }
}

impl TryFrom<SendPaymentEmailRequest> for PaymentNotification {
    type Error = NotificationError;

    fn try_from(request: SendPaymentEmailRequest) -> Result<Self, Self::Error> {
        let payment_date = request.payment_date.as_deref().and_then(|raw| {
            let parsed = parse_payment_date(raw);
            if parsed.is_none() {
                tracing::warn!(payment_date = %raw, "Ignoring unparseable payment date");
            }
            parsed
        });

        Ok(Self::new(
            request.to.unwrap_or_default(),
            request.order_id.unwrap_or_default(),
        )?
        .with_total_amount(request.total_amount)
        .with_transaction_id(request.transaction_id)
        .with_payment_date(payment_date))
    }
}

// ============================================================================
// Delivery results
// ============================================================================

/// Outcome of one orchestrated delivery (all attempts included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error_kind: Option<TransportErrorKind>,
    pub attempts: u32,
}

impl DeliveryResult {
    pub fn delivered(provider_message_id: Option<String>, attempts: u32) -> Self {
        Self {
            success: true,
            provider_message_id,
            error_kind: None,
            attempts,
        }
    }

    pub fn failed(error: &TransportError) -> Self {
        Self {
            success: false,
            provider_message_id: None,
            error_kind: Some(error.kind),
            attempts: error.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@shop.example.vn"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@@b.com"));
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let err = PaymentNotification::new("", "42").unwrap_err();
        assert!(err.to_string().contains("to and orderId are required"));

        let err = PaymentNotification::new("a@b.com", "   ").unwrap_err();
        assert!(err.to_string().contains("to and orderId are required"));
    }

    #[test]
    fn test_malformed_email_is_rejected() {
        let err = PaymentNotification::new("not-an-email", "123").unwrap_err();
        assert!(matches!(err, NotificationError::Validation(ref m) if m == "Invalid email format"));
    }

    #[test]
    fn test_padded_email_is_rejected() {
        for padded in [" a@b.com ", "a@b.com\n", "\ta@b.com"] {
            let err = PaymentNotification::new(padded, "42").unwrap_err();
            assert!(
                matches!(err, NotificationError::Validation(ref m) if m == "Invalid email format"),
                "{padded:?} was accepted"
            );
        }
    }

    #[test]
    fn test_recipient_name_is_local_part() {
        let n = PaymentNotification::new("nguyen.van.a@example.com", "1").unwrap();
        assert_eq!(n.recipient_name(), "nguyen.van.a");
    }

    #[test]
    fn test_request_accepts_numeric_order_id() {
        let request: SendPaymentEmailRequest =
            serde_json::from_str(r#"{"to":"a@b.com","orderId":42,"totalAmount":150000}"#).unwrap();
        assert_eq!(request.order_id.as_deref(), Some("42"));
        assert_eq!(request.total_amount, Some(150000.0));
    }

    #[test]
    fn test_request_tolerates_missing_and_null_fields() {
        let request: SendPaymentEmailRequest =
            serde_json::from_str(r#"{"orderId":null}"#).unwrap();
        assert!(request.to.is_none());
        assert!(request.order_id.is_none());
        assert!(PaymentNotification::try_from(request).is_err());
    }

    #[test]
    fn test_parse_payment_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap();
        assert_eq!(parse_payment_date("2024-03-05T08:30:00Z"), Some(expected));
        assert_eq!(parse_payment_date("2024-03-05T15:30:00+07:00"), Some(expected));
        assert_eq!(parse_payment_date("2024-03-05T08:30:00"), Some(expected));
        assert_eq!(
            parse_payment_date("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_payment_date("yesterday"), None);
    }

    #[test]
    fn test_try_from_request_drops_unparseable_date() {
        let request = SendPaymentEmailRequest {
            to: Some("a@b.com".into()),
            order_id: Some("7".into()),
            payment_date: Some("not a date".into()),
            transaction_id: Some("  ".into()),
            ..Default::default()
        };
        let n = PaymentNotification::try_from(request).unwrap();
        assert_eq!(n.payment_date(), None);
        assert_eq!(n.transaction_id(), None);
    }

    #[test]
    fn test_delivery_result_failed_carries_kind_and_attempts() {
        let err = TransportError::timeout("slow").with_attempts(3);
        let result = DeliveryResult::failed(&err);
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(TransportErrorKind::Timeout));
        assert_eq!(result.attempts, 3);
    }
}
