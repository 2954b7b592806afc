//! Ollama Provider
//!
//! Implementation of the LlmProvider trait for Ollama local inference via
//! its HTTP chat endpoint. No API key required.

use async_trait::async_trait;

use super::http_client::build_http_client;
use super::provider::{map_request_error, parse_http_error, LlmProvider};
use super::types::{ChatMessage, LlmError, LlmResult, ProviderConfig};

/// Default Ollama API endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama provider for local inference
pub struct OllamaProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs);
        Self { config, client }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL)
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url())
    }

    /// Build the request body for the chat endpoint
    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> serde_json::Value {
        let mut chat_messages: Vec<serde_json::Value> = Vec::new();

        if let Some(sys) = system {
            chat_messages.push(serde_json::json!({
                "role": "system",
                "content": sys,
            }));
        }

        for msg in messages {
            chat_messages.push(serde_json::json!({
                "role": msg.role.as_str(),
                "content": msg.content,
            }));
        }

        serde_json::json!({
            "model": self.config.model,
            "messages": chat_messages,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        system: Option<String>,
    ) -> LlmResult<String> {
        let body = self.build_request_body(&messages, system.as_deref());

        let response = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, "ollama"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_request_error(e, "ollama"))?;

        if !status.is_success() {
            return Err(parse_http_error(status.as_u16(), &text, "ollama"));
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError {
                message: format!("ollama: {}", e),
            })?;

        json["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "ollama: response has no message content".to_string(),
            })
    }

    async fn health_check(&self) -> LlmResult<()> {
        self.client
            .get(self.base_url())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| LlmError::ProviderUnavailable {
                message: format!("ollama server not reachable: {}", e),
            })
    }
}
