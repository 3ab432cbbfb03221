//! Conversation orchestration
//!
//! Resolves a character, assembles the prompt, calls the generation
//! endpoint, persists the resulting turn, and answers history queries.
//! Endpoint failures never abort the interaction: the caller always gets
//! text back, and nothing is persisted for a failed generation.

use crate::config::MemoryConfig;
use crate::core::gemini::GeminiClient;
use crate::error::{ChatError, Result};
use crate::prompt::build_prompt;
use crate::store::{Character, ChatStore, ConversationTurn, SessionSummary};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one chat exchange. `text` is either the generated reply or a
/// human-readable endpoint-failure message.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub session_id: String,
}

pub struct ChatService {
    store: Arc<dyn ChatStore>,
    client: GeminiClient,
    memory: MemoryConfig,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, client: GeminiClient, memory: MemoryConfig) -> Self {
        Self {
            store,
            client,
            memory,
        }
    }

    /// One chat exchange with `character_name`. A missing `session_id` gets
    /// a fresh UUID, returned alongside the reply so the caller can keep the
    /// session going.
    pub async fn chat(
        &self,
        character_name: &str,
        user_input: &str,
        user_id: i64,
        session_id: Option<String>,
    ) -> Result<ChatReply> {
        let character = self
            .store
            .character_by_name(character_name)
            .await?
            .ok_or_else(|| ChatError::CharacterNotFound(character_name.to_string()))?;

        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let prior_turns = if self.memory.include_history {
            let mut turns = self.store.turns_by_user(user_id).await?;
            // Keep only the newest turns so the prompt stays bounded.
            if turns.len() > self.memory.window {
                turns.drain(..turns.len() - self.memory.window);
            }
            turns
        } else {
            Vec::new()
        };

        let prompt = build_prompt(&character, &prior_turns, user_input);
        tracing::debug!(
            "[ChatService] Prompt for '{}' is {} chars ({} prior turns)",
            character_name,
            prompt.len(),
            prior_turns.len()
        );

        let generated = match self.client.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                // Failed generations are surfaced as text and not persisted.
                tracing::error!("[ChatService] Generation failed: {}", e);
                return Ok(ChatReply {
                    text: endpoint_failure_text(&e),
                    session_id,
                });
            }
        };

        self.store
            .append_turn(
                character.id,
                user_id,
                Some(&session_id),
                Some(user_input),
                &generated,
            )
            .await?;
        tracing::info!("[ChatService] Saved turn for session {}", session_id);

        Ok(ChatReply {
            text: generated,
            session_id,
        })
    }

    /// Formatted transcript of one session, or a descriptive sentinel when
    /// there is nothing to show.
    pub async fn history(&self, session_id: &str) -> Result<String> {
        if session_id.is_empty() {
            return Ok("No chat ID provided.".to_string());
        }

        let turns = self.store.turns_by_session(session_id).await?;
        if turns.is_empty() {
            return Ok("No chat history found for this ID.".to_string());
        }

        let character_name = self
            .store
            .character_by_id(turns[0].character_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_else(|| "Unknown Character".to_string());

        let mut out = format!("Chat History with {} (ID: {}):\n\n", character_name, session_id);
        for turn in &turns {
            out.push_str(&format!(
                "[{}]\nUser: {}\nBot: {}\n\n",
                turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
                turn.user_input.as_deref().unwrap_or(""),
                turn.bot_response
            ));
        }
        Ok(out)
    }

    /// Raw cross-session transcript for one user, ascending timestamp.
    pub async fn history_by_user(&self, user_id: i64) -> Result<Vec<ConversationTurn>> {
        self.store.turns_by_user(user_id).await
    }

    /// One summary row per stored session, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.store.session_summaries().await
    }

    pub async fn add_character(
        &self,
        name: &str,
        description: &str,
        prompt_template: &str,
    ) -> Result<Character> {
        self.store
            .create_character(name, description, prompt_template)
            .await
    }

    pub async fn list_characters(&self) -> Result<Vec<Character>> {
        self.store.list_characters().await
    }

    /// Insert the stock personas if absent. Idempotent; a name collision
    /// just means a prior run already seeded that persona.
    pub async fn seed_characters(&self) -> Result<()> {
        for (name, description, prompt_template) in STOCK_CHARACTERS {
            match self
                .store
                .create_character(name, description, prompt_template)
                .await
            {
                Ok(_) => tracing::info!("[ChatService] Seeded character '{}'", name),
                Err(ChatError::DuplicateName(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

const STOCK_CHARACTERS: [(&str, &str, &str); 3] = [
    (
        "Chuck the Clown",
        "A funny clown who tells jokes and entertains.",
        "You are Chuck the Clown, always ready with a joke and entertainment. \
         Be upbeat, silly, and include jokes in your responses.",
    ),
    (
        "Sarcastic Pirate",
        "A pirate with a sharp tongue and a love for treasure.",
        "You are a Sarcastic Pirate, ready to share your tales of adventure. \
         Use pirate slang, be witty, sarcastic, and mention your love for \
         treasure and the sea.",
    ),
    (
        "Professor Sage",
        "A wise professor knowledgeable about many subjects.",
        "You are Professor Sage, sharing wisdom and knowledge. Be scholarly, \
         thoughtful, and provide educational information in your responses.",
    ),
];

/// Render an endpoint failure the way the UI reports it.
fn endpoint_failure_text(error: &ChatError) -> String {
    match error {
        ChatError::Endpoint {
            status: Some(code),
            body,
        } if !error.is_unexpected_format() => {
            format!(
                "An error occurred while generating content: {} - {}",
                code, body
            )
        }
        e if e.is_unexpected_format() => {
            "An error occurred while generating content: Unexpected response format.".to_string()
        }
        ChatError::Endpoint { status: None, body } => {
            format!("An unexpected error occurred: {}", body)
        }
        other => format!("An unexpected error occurred: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::store::InMemoryStore;

    fn service_with_store() -> (ChatService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        // Unroutable endpoint; these tests never reach the network.
        let client = GeminiClient::new(
            &GenerationConfig {
                endpoint_url: "http://127.0.0.1:9".to_string(),
                timeout_ms: 100,
            },
            "test-key".to_string(),
        )
        .unwrap();
        let service = ChatService::new(store.clone(), client, MemoryConfig::default());
        (service, store)
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (service, _) = service_with_store();
        service.seed_characters().await.unwrap();
        service.seed_characters().await.unwrap();
        assert_eq!(service.list_characters().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn chat_with_unknown_character_is_typed_error() {
        let (service, store) = service_with_store();
        let err = service
            .chat("Nobody", "hi", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::CharacterNotFound(name) if name == "Nobody"));
        assert!(store.turns_by_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_returns_text_and_persists_nothing() {
        let (service, store) = service_with_store();
        service.seed_characters().await.unwrap();

        let reply = service
            .chat("Sarcastic Pirate", "hi", 1, Some("s-1".to_string()))
            .await
            .unwrap();
        assert!(reply.text.starts_with("An unexpected error occurred:"));
        assert_eq!(reply.session_id, "s-1");
        assert!(store.turns_by_session("s-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_sentinels() {
        let (service, _) = service_with_store();
        assert_eq!(service.history("").await.unwrap(), "No chat ID provided.");
        assert_eq!(
            service.history("missing").await.unwrap(),
            "No chat history found for this ID."
        );
    }

    #[tokio::test]
    async fn history_renders_transcript_in_order() {
        let (service, store) = service_with_store();
        service.seed_characters().await.unwrap();
        let character = store
            .character_by_name("Professor Sage")
            .await
            .unwrap()
            .unwrap();
        store
            .append_turn(character.id, 1, Some("s-9"), Some("first"), "one")
            .await
            .unwrap();
        store
            .append_turn(character.id, 1, Some("s-9"), Some("second"), "two")
            .await
            .unwrap();

        let transcript = service.history("s-9").await.unwrap();
        assert!(transcript.starts_with("Chat History with Professor Sage (ID: s-9):"));
        let first = transcript.find("User: first").unwrap();
        let second = transcript.find("User: second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn failure_text_variants() {
        let status = ChatError::Endpoint {
            status: Some(500),
            body: "boom".to_string(),
        };
        assert_eq!(
            endpoint_failure_text(&status),
            "An error occurred while generating content: 500 - boom"
        );

        let format = ChatError::unexpected_format(200);
        assert_eq!(
            endpoint_failure_text(&format),
            "An error occurred while generating content: Unexpected response format."
        );

        let transport = ChatError::Endpoint {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(
            endpoint_failure_text(&transport),
            "An unexpected error occurred: connection refused"
        );
    }
}
