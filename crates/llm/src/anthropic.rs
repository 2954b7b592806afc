//! Anthropic Claude Provider
//!
//! Implementation of the LlmProvider trait for Anthropic's Messages API.

use async_trait::async_trait;

use super::http_client::build_http_client;
use super::provider::{map_request_error, missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{ChatMessage, ChatRole, LlmError, LlmResult, ProviderConfig};

/// Default Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Current API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs);
        Self { config, client }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL)
    }

    /// Build the request body for the API.
    ///
    /// System messages in the history are folded into user turns since the
    /// Messages API takes the system prompt as a separate top-level field.
    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> serde_json::Value {
        let claude_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::Assistant => "assistant",
                    ChatRole::User | ChatRole::System => "user",
                };
                serde_json::json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": claude_messages,
        });

        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        body
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        system: Option<String>,
    ) -> LlmResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| missing_api_key_error("anthropic"))?;

        let body = self.build_request_body(&messages, system.as_deref());

        let response = self
            .client
            .post(self.base_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, "anthropic"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_request_error(e, "anthropic"))?;

        if !status.is_success() {
            return Err(parse_http_error(status.as_u16(), &text, "anthropic"));
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError {
                message: format!("anthropic: {}", e),
            })?;

        json["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "anthropic: response has no text content".to_string(),
            })
    }

    async fn health_check(&self) -> LlmResult<()> {
        if self.config.api_key.is_none() {
            return Err(missing_api_key_error("anthropic"));
        }
        Ok(())
    }
}
