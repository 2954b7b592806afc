//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI's Chat Completions API.

use async_trait::async_trait;

use super::http_client::build_http_client;
use super::provider::{map_request_error, missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{ChatMessage, ChatRole, LlmError, LlmResult, ProviderConfig};

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completions provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs);
        Self { config, client }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> serde_json::Value {
        let mut request_messages: Vec<serde_json::Value> = Vec::new();

        if let Some(sys) = system {
            request_messages.push(serde_json::json!({
                "role": "system",
                "content": sys,
            }));
        }

        for msg in messages {
            request_messages.push(serde_json::json!({
                "role": msg.role.as_str(),
                "content": msg.content,
            }));
        }

        serde_json::json!({
            "model": self.config.model,
            "messages": request_messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
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
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let body = self.build_request_body(&messages, system.as_deref());

        let response = self
            .client
            .post(self.base_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, "openai"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_request_error(e, "openai"))?;

        if !status.is_success() {
            return Err(parse_http_error(status.as_u16(), &text, "openai"));
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError {
                message: format!("openai: {}", e),
            })?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "openai: response has no message content".to_string(),
            })
    }

    async fn health_check(&self) -> LlmResult<()> {
        if self.config.api_key.is_none() {
            return Err(missing_api_key_error("openai"));
        }
        Ok(())
    }
}
