pub mod codes;
pub mod handlers;

pub use codes::ErrorCode;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Error envelope returned by every failing endpoint.
///
/// ```json
/// { "success": false, "error": "Invalid email format", "code": "VALIDATION_ERROR" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Always `false`; mirrors the `success: true` of successful responses
    pub success: bool,
    /// Human-readable error message
    pub error: String,
    /// Machine-readable error identifier, when one applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Pair the envelope with a status code.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_omits_missing_code() {
        let body = serde_json::to_value(ErrorResponse::new("boom")).unwrap();
        assert_eq!(body, json!({ "success": false, "error": "boom" }));
    }

    #[test]
    fn test_error_response_with_code() {
        let body =
            serde_json::to_value(ErrorResponse::new("Request timed out").with_code(ErrorCode::GatewayTimeout.as_str()))
                .unwrap();
        assert_eq!(
            body,
            json!({ "success": false, "error": "Request timed out", "code": "GATEWAY_TIMEOUT" })
        );
    }
}
