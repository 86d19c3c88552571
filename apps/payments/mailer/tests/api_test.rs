//! End-to-end router tests for the payment mailer, using a scripted transport.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use core_config::app_info;
use domain_notifications::{
    DeliveryOrchestrator, DeliveryPolicy, NotificationService, ScriptedEmailProvider,
    TemplateEngine,
};
use http_body_util::BodyExt;
use payment_mailer::build_router;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn app(provider: Arc<ScriptedEmailProvider>) -> Router {
    let orchestrator = DeliveryOrchestrator::new(provider, DeliveryPolicy::default());
    let service = NotificationService::new(TemplateEngine::new().unwrap(), orchestrator);
    build_router(app_info!(), service, Duration::from_secs(30))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_banner_lists_endpoints() {
    let response = app(Arc::new(ScriptedEmailProvider::new()))
        .oneshot(get("/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Email Service API is running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["endpoints"]["POST /api/send-payment-email"].is_string());
}

#[tokio::test]
async fn test_health_is_ok() {
    let response = app(Arc::new(ScriptedEmailProvider::new()))
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["scripted"]["configured"], true);
}

#[tokio::test]
async fn test_unknown_route_returns_404_envelope() {
    let response = app(Arc::new(ScriptedEmailProvider::new()))
        .oneshot(get("/api/unknown"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response.into_body()).await;
    assert_eq!(body, json!({ "success": false, "error": "Endpoint not found" }));
}

#[tokio::test]
async fn test_send_through_full_stack() {
    let provider = Arc::new(ScriptedEmailProvider::new());

    let request = Request::builder()
        .method("POST")
        .uri("/api/send-payment-email")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "to": "a@b.com",
                "orderId": "42",
                "totalAmount": 150000,
                "transactionId": "VNP14123456",
                "paymentDate": "2024-03-05T08:30:00Z"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app(provider.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(
        body,
        json!({ "success": true, "message": "Email sent successfully", "orderId": "42" })
    );

    let sent = provider.sent_emails().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].rendered.html.contains("15:30 05/03/2024"));
}
