//! Email template rendering engine.
//!
//! One built-in payment confirmation template, compiled once with Handlebars.
//! Rendering is pure: the same notification always yields byte-identical
//! output.

use crate::error::{NotificationError, NotificationResult};
use crate::models::PaymentNotification;
use chrono::{DateTime, FixedOffset, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

const PAYMENT_CONFIRMATION_HTML: &str = "payment_confirmation_html";
const PAYMENT_CONFIRMATION_TEXT: &str = "payment_confirmation_text";

const PAYMENT_CONFIRMATION_HTML_TEMPLATE: &str =
    include_str!("../../templates/payment_confirmation.html.hbs");
const PAYMENT_CONFIRMATION_TEXT_TEMPLATE: &str =
    include_str!("../../templates/payment_confirmation.txt.hbs");

/// Placeholder for optional fields the client did not send.
pub const NOT_AVAILABLE: &str = "N/A";

pub const PAYMENT_METHOD: &str = "VNPay";
pub const ORDER_STATUS: &str = "Đang giao hàng";
const CURRENCY: &str = "VNĐ";

/// Asia/Ho_Chi_Minh has no DST, so a fixed offset is exact.
const VIETNAM_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Display strings substituted into the template.
///
/// The HTTP-API transport forwards these as template parameters so the
/// provider-side template can show the same values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateFields {
    pub order_id: String,
    pub total_amount: String,
    /// Unformatted amount, 0 when absent.
    pub raw_amount: f64,
    pub has_amount: bool,
    pub currency: &'static str,
    pub transaction_id: String,
    pub payment_date: String,
    pub payment_method: &'static str,
    pub order_status: &'static str,
}

impl TemplateFields {
    fn from_notification(notification: &PaymentNotification) -> Self {
        Self {
            order_id: notification.order_id().to_string(),
            total_amount: notification
                .total_amount()
                .map(format_amount)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            raw_amount: notification.total_amount().unwrap_or(0.0),
            has_amount: notification.total_amount().is_some(),
            currency: CURRENCY,
            transaction_id: notification
                .transaction_id()
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            payment_date: notification
                .payment_date()
                .map(format_payment_date)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            payment_method: PAYMENT_METHOD,
            order_status: ORDER_STATUS,
        }
    }
}

/// Rendered email content.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    /// Plain text alternative body.
    pub text: String,
    pub fields: TemplateFields,
}

#[derive(Serialize)]
struct TemplateContext<'a> {
    subject: &'a str,
    #[serde(flatten)]
    fields: &'a TemplateFields,
}

/// Template engine for the payment confirmation email.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Compile the built-in templates.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        for (name, source) in [
            (PAYMENT_CONFIRMATION_HTML, PAYMENT_CONFIRMATION_HTML_TEMPLATE),
            (PAYMENT_CONFIRMATION_TEXT, PAYMENT_CONFIRMATION_TEXT_TEMPLATE),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| {
                    NotificationError::Template(format!("Failed to register {name}: {e}"))
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Render the confirmation email for a validated notification.
    pub fn render_payment_confirmation(
        &self,
        notification: &PaymentNotification,
    ) -> NotificationResult<RenderedEmail> {
        debug!(order_id = %notification.order_id(), "Rendering payment confirmation email");

        let fields = TemplateFields::from_notification(notification);
        let subject = payment_subject(notification.order_id());
        let context = TemplateContext {
            subject: &subject,
            fields: &fields,
        };

        let html = self.handlebars.render(PAYMENT_CONFIRMATION_HTML, &context)?;
        let text = self.handlebars.render(PAYMENT_CONFIRMATION_TEXT, &context)?;

        Ok(RenderedEmail {
            subject,
            html,
            text,
            fields,
        })
    }
}

/// Subject line for a payment confirmation.
pub fn payment_subject(order_id: &str) -> String {
    format!("✅ Thanh toán thành công - Đơn hàng #{order_id}")
}

/// Format an amount the way vi-VN does: whole units, `.` between thousands.
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// Format a payment timestamp in Vietnam local time as `HH:MM DD/MM/YYYY`.
pub fn format_payment_date(date: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(VIETNAM_UTC_OFFSET_SECS) {
        Some(offset) => date.with_timezone(&offset).format("%H:%M %d/%m/%Y").to_string(),
        None => date.format("%H:%M %d/%m/%Y").to_string(),
    }
}
