//! HTTP API module.

mod error;
mod handlers;
mod response;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorBody, ErrorResponse};
pub use handlers::HealthResponse;
pub use response::ApiResponse;
pub use routes::create_router;
pub use state::AppState;
