use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{PaymentNotification, SendPaymentEmailRequest, SendPaymentEmailResponse};
use crate::service::NotificationService;

#[derive(Clone)]
struct HandlerState {
    service: Arc<NotificationService>,
    request_timeout: Duration,
}

/// Routes for the payment mailer: `POST /api/send-payment-email` and
/// `GET /health`.
///
/// `request_timeout` bounds each send request; when it elapses the client
/// gets a 504 whatever the delivery layer is still doing.
pub fn router(service: NotificationService, request_timeout: Duration) -> Router {
    let state = HandlerState {
        service: Arc::new(service),
        request_timeout,
    };

    Router::new()
        .route("/api/send-payment-email", post(send_payment_email))
        .route("/health", get(health))
        .with_state(state)
}

async fn send_payment_email(
    State(state): State<HandlerState>,
    payload: Result<Json<SendPaymentEmailRequest>, JsonRejection>,
) -> NotificationResult<Json<SendPaymentEmailResponse>> {
    let Json(request) =
        payload.map_err(|rejection| NotificationError::InvalidJson(rejection.body_text()))?;

    let notification = PaymentNotification::try_from(request)?;
    let order_id = notification.order_id().to_string();

    tokio::time::timeout(
        state.request_timeout,
        state.service.send_payment_confirmation(notification),
    )
    .await
    .map_err(|_| NotificationError::RequestTimeout(state.request_timeout))??;

    Ok(Json(SendPaymentEmailResponse::sent(order_id)))
}

async fn health(State(state): State<HandlerState>) -> Json<Value> {
    let (transport, details) = state.service.transport_health();

    let mut body = Map::new();
    body.insert("status".to_string(), json!("ok"));
    body.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
    body.insert(transport.to_string(), details);

    Json(Value::Object(body))
}
