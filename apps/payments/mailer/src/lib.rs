//! Payment confirmation mailer service.
//!
//! Accepts completed-payment notifications over HTTP and emails the customer
//! a confirmation through SMTP or EmailJS.

pub mod config;

use axum::{Json, Router, routing::get};
use axum_helpers::{create_app, with_common_layers};
use core_config::AppInfo;
use core_config::tracing::init_tracing;
use domain_notifications::{
    DeliveryOrchestrator, NotificationService, TemplateEngine, build_provider, handlers,
};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};

pub use config::Config;

/// Full application router: banner, health, send endpoint and shared layers.
pub fn build_router(app: AppInfo, service: NotificationService, request_timeout: Duration) -> Router {
    let banner = Router::new().route("/", get(move || banner(app)));

    with_common_layers(banner.merge(handlers::router(service, request_timeout)))
}

async fn banner(app: AppInfo) -> Json<Value> {
    Json(json!({
        "message": "Email Service API is running",
        "version": app.version,
        "endpoints": {
            "GET /health": "Service and mail transport status",
            "POST /api/send-payment-email": "Send payment confirmation email",
        },
    }))
}

/// Load configuration, wire the mail transport and serve until shutdown.
pub async fn run() -> eyre::Result<()> {
    let config = Config::from_env()?;

    init_tracing(&config.environment);

    info!(
        name = config.app.name,
        version = config.app.version,
        environment = ?config.environment,
        "Starting payment mailer"
    );

    if !config.transport.is_configured() {
        warn!("Mail transport credentials are missing; sends will fail until configured");
    }

    let provider = build_provider(config.transport.clone())?;
    let orchestrator = DeliveryOrchestrator::new(provider, config.delivery.clone());
    let service = NotificationService::new(TemplateEngine::new()?, orchestrator);

    let router = build_router(config.app, service, config.server.request_timeout);

    create_app(router, &config.server).await?;

    info!("Payment mailer shut down gracefully");
    Ok(())
}
