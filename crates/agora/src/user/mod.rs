//! User directory.
//!
//! The chatbot only needs to turn a claimed username into a numeric id, so
//! this module keeps a minimal `users` table and exposes that lookup through
//! the [`UserDirectory`] trait.

mod models;
mod repository;

pub use models::{CreateUserRequest, User};
pub use repository::{UserDirectory, UserRepository};
