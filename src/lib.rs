//! Personae - persona-based chat over a hosted text-generation endpoint
//!
//! Users pick a stored character (name, description, prompt template),
//! exchange turns with the generation endpoint, and browse history by
//! session or by user. All state lives in the persistence store; the
//! service, client, and settings are constructed once at startup and
//! passed by handle.

pub mod config;
pub mod core;
pub mod error;
pub mod prompt;
pub mod service;
pub mod store;

pub mod cli;
pub mod utils;

pub use config::Settings;
pub use core::gemini::GeminiClient;
pub use error::ChatError;
pub use service::{ChatReply, ChatService};
pub use store::{Character, ChatStore, ConversationTurn, SessionSummary, SqliteStore};
