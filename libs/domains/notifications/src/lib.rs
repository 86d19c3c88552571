//! Payment confirmation notifications.
//!
//! ```text
//! POST /api/send-payment-email
//!          │
//! ┌────────▼────────┐
//! │    handlers     │  ← validation, request deadline, status mapping
//! └────────┬────────┘
//! ┌────────▼────────┐
//! │ NotificationSvc │  ← renders the confirmation template
//! └────────┬────────┘
//! ┌────────▼────────┐
//! │   Orchestrator  │  ← retries transient failures, delivery deadline
//! └────────┬────────┘
//! ┌────────▼────────┐
//! │  EmailProvider  │  ← SMTP (lettre) or EmailJS (reqwest)
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use core_config::FromEnv;
//! use domain_notifications::{
//!     DeliveryOrchestrator, DeliveryPolicy, NotificationService, TemplateEngine,
//!     TransportConfig, build_provider, handlers,
//! };
//!
//! let provider = build_provider(TransportConfig::from_env()?)?;
//! let orchestrator = DeliveryOrchestrator::new(provider, DeliveryPolicy::from_env()?);
//! let service = NotificationService::new(TemplateEngine::new()?, orchestrator);
//! let router = handlers::router(service, Duration::from_secs(30));
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod service;
pub mod templates;

pub use config::{EmailJsConfig, SmtpConfig, TransportConfig};
pub use delivery::{DeliveryOrchestrator, DeliveryPolicy};
pub use error::{NotificationError, NotificationResult, TransportError, TransportErrorKind};
pub use models::{
    DeliveryResult, PaymentNotification, SendPaymentEmailRequest, SendPaymentEmailResponse,
};
pub use providers::{
    EmailJsProvider, EmailProvider, OutgoingEmail, ScriptedEmailProvider, SentEmail, SmtpProvider,
    build_provider,
};
pub use service::NotificationService;
pub use templates::{RenderedEmail, TemplateEngine};
