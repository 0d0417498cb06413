//! Authentication module.
//!
//! Bearer tokens are optional: they name the caller for the chatbot, and
//! callers without one are anonymous.

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::Claims;
pub use config::{AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, identity_middleware};
