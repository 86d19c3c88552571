//! # Axum Helpers
//!
//! Shared building blocks for the workspace's Axum services.
//!
//! - **[`server`]**: listener bootstrap, common layers, graceful shutdown
//! - **[`http`]**: HTTP middleware (CORS)
//! - **[`errors`]**: the JSON error envelope, error codes and the 404 fallback

pub mod errors;
pub mod http;
pub mod server;

pub use errors::{ErrorCode, ErrorResponse, handlers::not_found};
pub use http::create_permissive_cors_layer;
pub use server::{create_app, shutdown_signal, with_common_layers};
