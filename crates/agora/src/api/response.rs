//! Success envelope.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// `{status: true, data, meta}` where `meta` is the RFC 3339 response time.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub data: T,
    pub meta: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: true,
            data,
            meta: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
