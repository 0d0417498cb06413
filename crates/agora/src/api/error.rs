//! API errors rendered as the platform's error envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// API error type with structured responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unreadable request body. Rendered as `{"error": "Invalid request"}`.
    #[error("Invalid request")]
    InvalidRequest,

    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(msg: impl Into<String>, details: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            details: Some(details.into()),
        }
    }

    /// Internal error whose cause is only logged.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            details: None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest | Self::BadRequest { .. } => "BAD_REQUEST",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Error details inside the envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub status: &'static str,
    pub message: String,
    pub details: Option<String>,
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: bool,
    pub error: ErrorBody,
    pub data: Option<()>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let (message, details) = match self {
            ApiError::InvalidRequest => {
                return (status, Json(json!({ "error": "Invalid request" }))).into_response();
            }
            ApiError::BadRequest { message, details } => {
                debug!(error_code = code, %message, "Client error");
                (message, details)
            }
            ApiError::Internal { message, details } => {
                error!(error_code = code, %message, "API error");
                (message, details)
            }
        };

        let body = ErrorResponse {
            status: false,
            error: ErrorBody {
                code: status.as_u16(),
                status: code,
                message,
                details,
            },
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_envelope() {
        let response = ApiError::internal("something bad happened").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(
            json,
            json!({
                "status": false,
                "error": {
                    "code": 500,
                    "status": "INTERNAL_SERVER_ERROR",
                    "message": "something bad happened",
                    "details": null
                },
                "data": null
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_request_body() {
        let response = ApiError::InvalidRequest.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "Invalid request" }));
    }

    #[tokio::test]
    async fn test_bad_request_keeps_details() {
        let response = ApiError::bad_request("Invalid query", "unknown category").into_response();
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], 400);
        assert_eq!(json["error"]["details"], "unknown category");
    }
}
