//! HTTP handlers for health and the chatbot.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::auth::CurrentUser;
use crate::chatbot::{ANONYMOUS_USERNAME, AiExchange, AskRequest, AskResponse, ExchangeQuery};

use super::error::{ApiError, ApiResult};
use super::response::ApiResponse;
use super::state::AppState;

/// Message returned for every chatbot pipeline failure.
const ASK_FAILED: &str = "something bad happened";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Ask the chatbot a question.
///
/// POST /api/chatbot/ask
#[instrument(skip_all)]
pub async fn ask(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<AskResponse>> {
    let Json(request) = payload.map_err(|e| {
        debug!("Rejecting ask payload: {}", e);
        ApiError::InvalidRequest
    })?;

    let username = user
        .as_ref()
        .map(CurrentUser::username)
        .unwrap_or(ANONYMOUS_USERNAME);
    let question = request.query_message.trim();

    match state.chatbot.ask(Some(username), question).await {
        Ok(answer) => Ok(ApiResponse::success(AskResponse { response: answer })),
        Err(e) => {
            match e.answer() {
                Some(answer) => warn!(username, answer, "answer generated but not stored: {}", e),
                None => error!(username, "chatbot ask failed: {}", e),
            }
            Err(ApiError::internal(ASK_FAILED))
        }
    }
}

/// List stored exchanges, newest first. Requires a valid token.
///
/// GET /api/chatbot/exchanges?category=&asked_by=&limit=
#[instrument(skip_all, fields(username = user.username()))]
pub async fn list_exchanges(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<ExchangeQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<AiExchange>>> {
    let Query(query) =
        query.map_err(|e| ApiError::bad_request("Invalid query", e.body_text()))?;

    let exchanges = state.chatbot.exchanges(query).await.map_err(|e| {
        error!("Failed to list exchanges: {:#}", e);
        ApiError::internal("failed to list exchanges")
    })?;

    Ok(ApiResponse::success(exchanges))
}
