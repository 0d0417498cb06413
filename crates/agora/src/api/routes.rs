//! API route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::identity_middleware;
use crate::chat;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Chat is unauthenticated: any client may post under any username.
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ws/chat", get(chat::ws_chat_handler))
        .route("/api/chat/messages", get(chat::list_messages))
        .with_state(state.clone());

    let chatbot_routes = Router::new()
        .route("/api/chatbot/ask", post(handlers::ask))
        .route("/api/chatbot/exchanges", get(handlers::list_exchanges))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            identity_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(chatbot_routes)
        .layer(trace_layer)
}
