use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::chat::ChatMessage;
use crate::constants::NO_RESPONSE_PLACEHOLDER;

// Structures matching Ollama's /api/chat endpoint
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool, // We want the full response, not a stream
}

#[derive(Deserialize, Debug)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    // Other fields like created_at, timings, etc., are ignored
}

#[derive(Deserialize, Debug)]
struct OllamaMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking-style (non-streaming) client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends the conversation to `model` and returns the assistant text.
    /// A reply without `message.content` yields the "No response received"
    /// placeholder.
    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let payload = OllamaChatRequest {
            model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context(format!("Failed to send request to Ollama API at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Ollama API request failed");
            return Err(anyhow::anyhow!(
                "Ollama API request failed with status {}: {}",
                status,
                error_body
            ));
        }

        let reply = response
            .json::<OllamaChatResponse>()
            .await
            .context("Failed to parse JSON response from Ollama API")?;

        debug!(?reply, "Received Ollama response");

        Ok(reply
            .message
            .and_then(|m| m.content)
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()))
    }
}
