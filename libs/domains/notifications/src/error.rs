//! Error types for the notifications domain.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_helpers::{ErrorCode, ErrorResponse};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Classification of a transport failure.
///
/// Only [`Timeout`](Self::Timeout) and [`ConnectionReset`](Self::ConnectionReset)
/// are transient; everything else is surfaced without retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportErrorKind {
    /// Credentials or provider identifiers are missing or rejected as invalid.
    Configuration,
    /// The provider refused our credentials.
    Authentication,
    /// The message itself could not be built or was refused as malformed.
    InvalidRequest,
    /// The provider does not know the configured service or template.
    UnknownResource,
    /// A network call or the overall delivery deadline elapsed.
    Timeout,
    /// The connection was reset, aborted or closed mid-conversation.
    ConnectionReset,
    /// The provider answered with a permanent refusal not covered above.
    Rejected,
    /// Anything we could not classify.
    Internal,
}

impl TransportErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionReset)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Authentication => "AUTHENTICATION_FAILED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownResource => "UNKNOWN_RESOURCE",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionReset => "CONNECTION_RESET",
            Self::Rejected => "REJECTED",
            Self::Internal => ErrorCode::InternalError.as_str(),
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed delivery attempt (or attempt sequence) with its classification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    /// Number of attempts made before this error was surfaced. Zero until the
    /// orchestrator annotates it.
    pub attempts: u32,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 0,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Configuration, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// First `io::Error` kind found in an error's source chain.
pub(crate) fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        current = e.source();
    }
    None
}

/// I/O failures where the peer dropped the conversation.
pub(crate) fn is_connection_reset(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;

    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}

/// Errors that can occur in the notifications domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Malformed or missing input. Rejected before any delivery is attempted.
    #[error("{0}")]
    Validation(String),

    /// The request body was not valid JSON for the endpoint.
    #[error("{0}")]
    InvalidJson(String),

    /// Template rendering failed.
    #[error("Template rendering error: {0}")]
    Template(String),

    /// Delivery failed after the orchestrator gave up.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request-level deadline elapsed before delivery resolved.
    #[error("Email service did not respond within {0:?}")]
    RequestTimeout(Duration),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::Template(err.to_string())
    }
}

impl NotificationError {
    /// HTTP status for this error. The HTTP layer is the only place kinds map
    /// to statuses.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::Template(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError.as_str(),
            Self::InvalidJson(_) => ErrorCode::InvalidJson.as_str(),
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::Transport(e) => e.kind.as_str(),
            Self::RequestTimeout(_) => ErrorCode::GatewayTimeout.as_str(),
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Validation(msg) | Self::InvalidJson(msg) => {
                tracing::info!(error_code = self.code(), "Rejected request: {}", msg);
            }
            Self::Transport(e) => {
                tracing::error!(
                    error_code = self.code(),
                    attempts = e.attempts,
                    "Error sending email: {}",
                    e
                );
            }
            _ => {
                tracing::error!(error_code = self.code(), "Error sending email: {}", self);
            }
        }

        let body = match self {
            // Validation and timeout failures carry only a message.
            Self::Validation(_) | Self::InvalidJson(_) | Self::RequestTimeout(_) => {
                ErrorResponse::new(self.to_string())
            }
            other => {
                let code = other.code();
                ErrorResponse::new(other.to_string()).with_code(code)
            }
        };

        body.into_response_with(status)
    }
}
