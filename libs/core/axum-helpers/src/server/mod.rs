//! Server infrastructure: listener bootstrap, shared layers and graceful shutdown.
//!
//! ```ignore
//! use axum_helpers::server::{create_app, with_common_layers};
//! use core_config::server::ServerConfig;
//!
//! let app = with_common_layers(routes);
//! create_app(app, &ServerConfig::default()).await?;
//! ```

pub mod app;
pub mod shutdown;

pub use app::{create_app, with_common_layers};
pub use shutdown::shutdown_signal;
