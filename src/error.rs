//! Failure taxonomy shared by all components
//!
//! Every component returns typed errors so callers can tell a retryable
//! transport fault apart from a terminal condition. The CLI converts each
//! variant into a printed message; nothing here unwinds past the service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Character creation collided with an existing name. Raised from the
    /// storage-level UNIQUE constraint, never from a read-then-insert check.
    #[error("character '{0}' already exists")]
    DuplicateName(String),

    /// Chat was requested against a character name that is not stored.
    #[error("character '{0}' not found")]
    CharacterNotFound(String),

    /// The generation endpoint failed: bad status, transport fault, or a
    /// 2xx body with no extractable candidate text. `status` is `None` for
    /// transport-level faults (connect error, timeout).
    #[error("generation endpoint error{}: {body}", status_suffix(.status))]
    Endpoint {
        status: Option<u16>,
        body: String,
    },

    /// Any persistence fault other than a name collision.
    #[error("storage error: {0}")]
    Storage(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

impl ChatError {
    /// Sentinel body for a 2xx response whose shape carries no candidate
    /// text. Logically distinct from a status failure for diagnostics, but
    /// surfaced to callers the same way.
    pub const UNEXPECTED_FORMAT: &'static str = "Unexpected response format";

    pub fn unexpected_format(status: u16) -> Self {
        Self::Endpoint {
            status: Some(status),
            body: Self::UNEXPECTED_FORMAT.to_string(),
        }
    }

    pub fn is_unexpected_format(&self) -> bool {
        matches!(self, Self::Endpoint { body, .. } if body == Self::UNEXPECTED_FORMAT)
    }
}

impl From<rusqlite::Error> for ChatError {
    fn from(e: rusqlite::Error) -> Self {
        ChatError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
