//! SQLite-backed store
//!
//! Single connection behind a mutex; every operation runs one statement or
//! one implicit transaction, so a returned `Ok` means the write is durable.

use super::{Character, ChatStore, ConversationTurn, SessionSummary};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Private throwaway database, used by tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ChatError::Storage("database mutex poisoned".to_string()))
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id              INTEGER PRIMARY KEY,
                name            TEXT NOT NULL UNIQUE,
                description     TEXT NOT NULL,
                prompt_template TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS conversations (
                id            INTEGER PRIMARY KEY,
                character_id  INTEGER NOT NULL REFERENCES characters(id),
                user_id       INTEGER NOT NULL,
                session_id    TEXT,
                user_input    TEXT,
                bot_response  TEXT NOT NULL,
                timestamp     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_session
                ON conversations(session_id);
            CREATE INDEX IF NOT EXISTS idx_conversations_user
                ON conversations(user_id);
            "#,
        )?;
        tracing::debug!("[SqliteStore] Schema ensured");
        Ok(())
    }
}

fn column_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_turn(row: &Row<'_>) -> rusqlite::Result<ConversationTurn> {
    Ok(ConversationTurn {
        id: row.get(0)?,
        character_id: row.get(1)?,
        user_id: row.get(2)?,
        session_id: row.get(3)?,
        user_input: row.get(4)?,
        bot_response: row.get(5)?,
        timestamp: column_ts(row, 6)?,
    })
}

const TURN_COLUMNS: &str =
    "id, character_id, user_id, session_id, user_input, bot_response, timestamp";

#[async_trait]
impl ChatStore for SqliteStore {
    async fn create_character(
        &self,
        name: &str,
        description: &str,
        prompt_template: &str,
    ) -> Result<Character> {
        let conn = self.lock_conn()?;
        let inserted = conn.execute(
            "INSERT INTO characters (name, description, prompt_template) VALUES (?1, ?2, ?3)",
            params![name, description, prompt_template],
        );
        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                tracing::info!("[SqliteStore] Created character '{}' (id {})", name, id);
                Ok(Character {
                    id,
                    name: name.to_string(),
                    description: description.to_string(),
                    prompt_template: prompt_template.to_string(),
                })
            }
            Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                Err(ChatError::DuplicateName(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn character_by_name(&self, name: &str) -> Result<Option<Character>> {
        let conn = self.lock_conn()?;
        let character = conn
            .query_row(
                "SELECT id, name, description, prompt_template
                 FROM characters WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Character {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        prompt_template: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(character)
    }

    async fn character_by_id(&self, id: i64) -> Result<Option<Character>> {
        let conn = self.lock_conn()?;
        let character = conn
            .query_row(
                "SELECT id, name, description, prompt_template
                 FROM characters WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Character {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        prompt_template: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(character)
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, prompt_template
             FROM characters ORDER BY name",
        )?;
        let characters = stmt
            .query_map([], |row| {
                Ok(Character {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    prompt_template: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
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
        let timestamp = Utc::now();
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO conversations
                 (character_id, user_id, session_id, user_input, bot_response, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                character_id,
                user_id,
                session_id,
                user_input,
                bot_response,
                timestamp.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(
            "[SqliteStore] Appended turn {} (session {:?}, user {})",
            id,
            session_id,
            user_id
        );
        Ok(ConversationTurn {
            id,
            character_id,
            user_id,
            session_id: session_id.map(str::to_string),
            user_input: user_input.map(str::to_string),
            bot_response: bot_response.to_string(),
            timestamp,
        })
    }

    async fn turns_by_session(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TURN_COLUMNS} FROM conversations
             WHERE session_id = ?1 ORDER BY timestamp, id"
        ))?;
        let turns = stmt
            .query_map(params![session_id], map_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    async fn turns_by_user(&self, user_id: i64) -> Result<Vec<ConversationTurn>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TURN_COLUMNS} FROM conversations
             WHERE user_id = ?1 ORDER BY timestamp, id"
        ))?;
        let turns = stmt
            .query_map(params![user_id], map_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    async fn session_summaries(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.session_id, ch.name, MIN(c.timestamp), COUNT(c.id)
             FROM conversations c
             JOIN characters ch ON c.character_id = ch.id
             WHERE c.session_id IS NOT NULL
             GROUP BY c.session_id, ch.name
             ORDER BY MIN(c.timestamp) DESC",
        )?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    session_id: row.get(0)?,
                    character_name: row.get(1)?,
                    first_timestamp: column_ts(row, 2)?,
                    turn_count: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_character() -> (SqliteStore, Character) {
        let store = SqliteStore::open_in_memory().unwrap();
        let character = store
            .create_character("Sarcastic Pirate", "A pirate with a sharp tongue.", "You are a pirate.")
            .await
            .unwrap();
        (store, character)
    }

    #[tokio::test]
    async fn create_then_lookup_round_trips() {
        let (store, created) = store_with_character().await;
        let found = store
            .character_by_name("Sarcastic Pirate")
            .await
            .unwrap()
            .expect("character should exist");
        assert_eq!(found.id, created.id);
        assert_eq!(found.description, "A pirate with a sharp tongue.");
        assert_eq!(found.prompt_template, "You are a pirate.");
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_without_write() {
        let (store, _) = store_with_character().await;
        let err = store
            .create_character("Sarcastic Pirate", "impostor", "template")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::DuplicateName(name) if name == "Sarcastic Pirate"));
        assert_eq!(store.list_characters().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_check_is_case_sensitive() {
        let (store, _) = store_with_character().await;
        store
            .create_character("sarcastic pirate", "lowercase twin", "template")
            .await
            .unwrap();
        assert_eq!(store.list_characters().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lookup_of_unknown_name_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.character_by_name("Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn turns_by_session_come_back_in_insertion_order() {
        let (store, character) = store_with_character().await;
        for i in 0..3 {
            store
                .append_turn(
                    character.id,
                    1,
                    Some("s-1"),
                    Some(&format!("msg {i}")),
                    &format!("reply {i}"),
                )
                .await
                .unwrap();
        }
        let turns = store.turns_by_session("s-1").await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].user_input.as_deref(), Some("msg 0"));
        assert_eq!(turns[2].bot_response, "reply 2");
        assert!(turns.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn turns_by_user_span_sessions() {
        let (store, character) = store_with_character().await;
        store
            .append_turn(character.id, 7, Some("s-a"), Some("a"), "ra")
            .await
            .unwrap();
        store
            .append_turn(character.id, 7, Some("s-b"), Some("b"), "rb")
            .await
            .unwrap();
        store
            .append_turn(character.id, 8, Some("s-a"), Some("other"), "ro")
            .await
            .unwrap();

        let turns = store.turns_by_user(7).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].session_id.as_deref(), Some("s-a"));
        assert_eq!(turns[1].session_id.as_deref(), Some("s-b"));
    }

    #[tokio::test]
    async fn summaries_group_and_count_per_session() {
        let (store, character) = store_with_character().await;
        let first = store
            .append_turn(character.id, 1, Some("s-1"), Some("a"), "ra")
            .await
            .unwrap();
        store
            .append_turn(character.id, 1, Some("s-1"), Some("b"), "rb")
            .await
            .unwrap();
        store
            .append_turn(character.id, 1, Some("s-2"), Some("c"), "rc")
            .await
            .unwrap();
        // Legacy row without a session id never shows up in summaries.
        store
            .append_turn(character.id, 1, None, Some("d"), "rd")
            .await
            .unwrap();

        let summaries = store.session_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        let s1 = summaries
            .iter()
            .find(|s| s.session_id == "s-1")
            .expect("s-1 summarized");
        assert_eq!(s1.turn_count, 2);
        assert_eq!(s1.character_name, "Sarcastic Pirate");
        assert_eq!(s1.first_timestamp, first.timestamp);
    }
}
