//! Test utilities and common setup.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agora::api::{self, AppState};
use agora::auth::{AuthConfig, AuthState};
use agora::chat::{ChatConfig, ChatHub};
use agora::chatbot::{ChatbotConfig, ChatbotService, ExchangeRepository};
use agora::db::Database;
use agora::generation::{GenerationClient, GenerationConfig};
use agora::user::{CreateUserRequest, UserRepository};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use tokio::net::TcpListener;

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

/// How the mock generation backend answers.
#[derive(Debug, Clone)]
pub enum BackendReply {
    /// One JSON object.
    Single(&'static str),
    /// Newline-delimited chunks, the last one marked done.
    Stream(Vec<&'static str>),
    /// An error status with a plain-text body.
    Status(u16),
    /// Never answers within any test timeout.
    Stall,
}

/// A running mock of the generation backend.
#[derive(Clone)]
pub struct MockBackend {
    pub base_url: String,
    /// Request bodies received on `/api/generate`.
    pub requests: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct BackendState {
    reply: BackendReply,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn generate(State(state): State<BackendState>, Json(body): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(body);

    match state.reply {
        BackendReply::Single(text) => {
            Json(serde_json::json!({ "response": text, "done": true })).into_response()
        }
        BackendReply::Stream(chunks) => {
            let last = chunks.len().saturating_sub(1);
            let body: String = chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| {
                    let line = serde_json::json!({ "response": chunk, "done": i == last });
                    format!("{line}\n")
                })
                .collect();
            (
                [("content-type", "application/x-ndjson")],
                Body::from(body),
            )
                .into_response()
        }
        BackendReply::Status(status) => (
            StatusCode::from_u16(status).unwrap(),
            "backend exploded",
        )
            .into_response(),
        BackendReply::Stall => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Start a mock generation backend.
pub async fn spawn_backend(reply: BackendReply) -> MockBackend {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/api/generate", post(generate))
        .with_state(BackendState {
            reply,
            requests: requests.clone(),
        });
    let addr = serve(router).await;

    MockBackend {
        base_url: format!("http://{addr}"),
        requests,
    }
}

/// Everything a test needs to drive and inspect the application.
pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub hub: ChatHub,
    pub auth: AuthState,
    pub users: UserRepository,
    pub exchanges: ExchangeRepository,
    pub backend: MockBackend,
}

impl TestApp {
    /// Bearer token for `username`.
    pub fn token(&self, username: &str) -> String {
        self.auth.generate_token(username).unwrap()
    }

    pub async fn add_user(&self, username: &str) -> i64 {
        self.users
            .create(CreateUserRequest::new(username))
            .await
            .unwrap()
            .id
    }
}

/// Create a test application backed by an in-memory database and a mock
/// generation backend.
pub async fn test_app(reply: BackendReply) -> TestApp {
    test_app_with(reply, ChatbotConfig::default()).await
}

pub async fn test_app_with(reply: BackendReply, chatbot: ChatbotConfig) -> TestApp {
    build_test_app(reply, chatbot, 10).await
}

/// Test application whose generation client gives up after
/// `generation_timeout_secs`.
pub async fn test_app_with_timeout(reply: BackendReply, generation_timeout_secs: u64) -> TestApp {
    build_test_app(reply, ChatbotConfig::default(), generation_timeout_secs).await
}

async fn build_test_app(
    reply: BackendReply,
    chatbot: ChatbotConfig,
    generation_timeout_secs: u64,
) -> TestApp {
    let backend = spawn_backend(reply).await;
    let db = Database::in_memory().await.unwrap();

    let users = UserRepository::new(db.pool().clone());
    let exchanges = ExchangeRepository::new(db.pool().clone());
    let generator = GenerationClient::new(GenerationConfig {
        base_url: backend.base_url.clone(),
        timeout_secs: generation_timeout_secs,
        ..GenerationConfig::default()
    })
    .unwrap();

    let service = ChatbotService::new(
        Arc::new(users.clone()),
        Arc::new(generator),
        Arc::new(exchanges.clone()),
        chatbot,
    );

    let auth = AuthState::new(&AuthConfig {
        jwt_secret: Some(TEST_SECRET.to_string()),
    })
    .unwrap();

    let chat = ChatConfig::default();
    let hub = ChatHub::new(&chat);
    let state = AppState::new(hub.clone(), chat, service, auth.clone());

    TestApp {
        router: api::create_router(state),
        db,
        hub,
        auth,
        users,
        exchanges,
        backend,
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
