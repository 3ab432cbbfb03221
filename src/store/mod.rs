//! Character and conversation persistence
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between SQLite and memory without API changes
//! - Each implementation enforces the name-uniqueness invariant itself;
//!   callers never pre-check and insert as two steps

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// A named persona: its prompt template is prepended to every prompt built
/// for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub prompt_template: String,
}

/// One user-message/bot-response pair. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub character_id: i64,
    pub user_id: i64,
    /// Groups turns into one ongoing exchange. `None` only for ungrouped
    /// legacy rows; the service always supplies a value for new turns.
    pub session_id: Option<String>,
    pub user_input: Option<String>,
    pub bot_response: String,
    /// Assigned by the store at append time.
    pub timestamp: DateTime<Utc>,
}

/// One row per distinct non-null session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub character_name: String,
    pub first_timestamp: DateTime<Utc>,
    pub turn_count: u64,
}

/// Trait defining the persistence interface
///
/// All mutating operations are durable before returning. Orderings are by
/// timestamp ascending, ties broken by insertion order.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a character. Fails with `DuplicateName` if the name is taken;
    /// the collision check is a storage-level constraint, not a prior read.
    async fn create_character(
        &self,
        name: &str,
        description: &str,
        prompt_template: &str,
    ) -> Result<Character>;

    /// Look up a character by its unique name.
    async fn character_by_name(&self, name: &str) -> Result<Option<Character>>;

    /// Look up a character by its store-assigned id.
    async fn character_by_id(&self, id: i64) -> Result<Option<Character>>;

    /// All characters, ordered by name.
    async fn list_characters(&self) -> Result<Vec<Character>>;

    /// Append an immutable turn. The store assigns id and timestamp.
    async fn append_turn(
        &self,
        character_id: i64,
        user_id: i64,
        session_id: Option<&str>,
        user_input: Option<&str>,
        bot_response: &str,
    ) -> Result<ConversationTurn>;

    /// Full transcript of one session, ascending timestamp.
    async fn turns_by_session(&self, session_id: &str) -> Result<Vec<ConversationTurn>>;

    /// All of a user's turns across sessions, ascending timestamp.
    async fn turns_by_user(&self, user_id: i64) -> Result<Vec<ConversationTurn>>;

    /// One summary row per distinct non-null session id, ordered by first
    /// timestamp descending.
    async fn session_summaries(&self) -> Result<Vec<SessionSummary>>;
}
