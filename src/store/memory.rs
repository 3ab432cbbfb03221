//! In-Memory Store
//!
//! Information Hiding:
//! - Vec-backed tables hidden behind the trait, thread-safe via RwLock
//! - Suitable for tests and throwaway runs; data dies with the process

use super::{Character, ChatStore, ConversationTurn, SessionSummary};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    characters: Vec<Character>,
    turns: Vec<ConversationTurn>,
    next_character_id: i64,
    next_turn_id: i64,
}

pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables {
                next_character_id: 1,
                next_turn_id: 1,
                ..Tables::default()
            })),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn create_character(
        &self,
        name: &str,
        description: &str,
        prompt_template: &str,
    ) -> Result<Character> {
        let mut tables = self.tables.write().await;
        // Uniqueness check and insert happen under one write lock, which is
        // this backend's equivalent of the SQL constraint.
        if tables.characters.iter().any(|c| c.name == name) {
            return Err(ChatError::DuplicateName(name.to_string()));
        }
        let character = Character {
            id: tables.next_character_id,
            name: name.to_string(),
            description: description.to_string(),
            prompt_template: prompt_template.to_string(),
        };
        tables.next_character_id += 1;
        tables.characters.push(character.clone());
        tracing::debug!("[InMemoryStore] Created character '{}'", name);
        Ok(character)
    }

    async fn character_by_name(&self, name: &str) -> Result<Option<Character>> {
        let tables = self.tables.read().await;
        Ok(tables.characters.iter().find(|c| c.name == name).cloned())
    }

    async fn character_by_id(&self, id: i64) -> Result<Option<Character>> {
        let tables = self.tables.read().await;
        Ok(tables.characters.iter().find(|c| c.id == id).cloned())
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        let tables = self.tables.read().await;
        let mut characters = tables.characters.clone();
        characters.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(characters)
    }

    async fn append_turn(
        &self,
        character_id: i64,
        user_id: i64,
        session_id: Option<&str>,
        user_input: Option<&str>,
        bot_response: &str,
    ) -> Result<ConversationTurn> {
        let mut tables = self.tables.write().await;
        if !tables.characters.iter().any(|c| c.id == character_id) {
            return Err(ChatError::Storage(format!(
                "unknown character id {}",
                character_id
            )));
        }
        let turn = ConversationTurn {
            id: tables.next_turn_id,
            character_id,
            user_id,
            session_id: session_id.map(str::to_string),
            user_input: user_input.map(str::to_string),
            bot_response: bot_response.to_string(),
            timestamp: Utc::now(),
        };
        tables.next_turn_id += 1;
        tables.turns.push(turn.clone());
        Ok(turn)
    }

    async fn turns_by_session(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let tables = self.tables.read().await;
        let mut turns: Vec<_> = tables
            .turns
            .iter()
            .filter(|t| t.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect();
        turns.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(turns)
    }

    async fn turns_by_user(&self, user_id: i64) -> Result<Vec<ConversationTurn>> {
        let tables = self.tables.read().await;
        let mut turns: Vec<_> = tables
            .turns
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        turns.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(turns)
    }

    async fn session_summaries(&self) -> Result<Vec<SessionSummary>> {
        let tables = self.tables.read().await;
        let mut summaries: Vec<SessionSummary> = Vec::new();
        for turn in &tables.turns {
            let Some(session_id) = turn.session_id.as_deref() else {
                continue;
            };
            match summaries.iter_mut().find(|s| s.session_id == session_id) {
                Some(summary) => {
                    summary.turn_count += 1;
                    if turn.timestamp < summary.first_timestamp {
                        summary.first_timestamp = turn.timestamp;
                    }
                }
                None => {
                    let character_name = tables
                        .characters
                        .iter()
                        .find(|c| c.id == turn.character_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| "Unknown Character".to_string());
                    summaries.push(SessionSummary {
                        session_id: session_id.to_string(),
                        character_name,
                        first_timestamp: turn.timestamp,
                        turn_count: 1,
                    });
                }
            }
        }
        summaries.sort_by(|a, b| b.first_timestamp.cmp(&a.first_timestamp));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let store = InMemoryStore::new();
        store.create_character("Pirate", "d", "t").await.unwrap();
        let err = store.create_character("Pirate", "d2", "t2").await.unwrap_err();
        assert!(matches!(err, ChatError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn append_requires_known_character() {
        let store = InMemoryStore::new();
        let err = store
            .append_turn(42, 1, Some("s"), Some("hi"), "yo")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Storage(_)));
    }

    #[tokio::test]
    async fn summaries_order_newest_first() {
        let store = InMemoryStore::new();
        let c = store.create_character("Pirate", "d", "t").await.unwrap();
        store
            .append_turn(c.id, 1, Some("old"), Some("a"), "ra")
            .await
            .unwrap();
        store
            .append_turn(c.id, 1, Some("new"), Some("b"), "rb")
            .await
            .unwrap();
        let summaries = store.session_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].first_timestamp >= summaries[1].first_timestamp);
    }
}
