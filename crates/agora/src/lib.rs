//! Agora: the chat hub and chatbot backend of a community platform.
//!
//! - [`chat`]: one shared WebSocket room with bounded replay history.
//! - [`chatbot`]: answers questions through a local text-generation backend
//!   and records each exchange.

pub mod api;
pub mod auth;
pub mod chat;
pub mod chatbot;
pub mod config;
pub mod db;
pub mod generation;
pub mod user;
