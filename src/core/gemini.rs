//! Generation endpoint client
//!
//! One HTTPS POST per `generate` call against a Gemini-style
//! `generateContent` endpoint. No retry, no backoff, no streaming; a bounded
//! timeout is applied and every failure comes back as an endpoint error.

use crate::config::GenerationConfig;
use crate::error::{ChatError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GeneratePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateRequest {
    fn single_turn(prompt: &str) -> Self {
        Self {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

impl GenerateResponse {
    /// First candidate's first part text, if the shape carries one.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
    }
}

pub struct GeminiClient {
    client: Client,
    endpoint_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Builds the shared HTTP client once; endpoint and credential are fixed
    /// for the life of the process.
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ChatError::Endpoint {
                status: None,
                body: format!("failed to construct HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            api_key,
        })
    }

    /// Send `prompt` as the sole content of a single-turn request and return
    /// the generated text. Exactly one request per call.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest::single_turn(prompt);

        let response = self
            .client
            .post(&self.endpoint_url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("[GeminiClient] Transport fault: {}", e);
                ChatError::Endpoint {
                    status: None,
                    body: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                "[GeminiClient] Endpoint returned status {}: {}",
                status,
                body
            );
            return Err(ChatError::Endpoint {
                status: Some(status.as_u16()),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            tracing::warn!("[GeminiClient] Failed to decode response body: {}", e);
            ChatError::unexpected_format(status.as_u16())
        })?;

        match parsed.first_text() {
            Some(text) => Ok(text),
            None => {
                tracing::error!("[GeminiClient] Response carried no candidate text");
                Err(ChatError::unexpected_format(status.as_u16()))
            }
        }
    }
}
