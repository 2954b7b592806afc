//! Google Gemini Provider
//!
//! Implementation of the LlmProvider trait for the Gemini generateContent API.

use async_trait::async_trait;

use super::http_client::build_http_client;
use super::provider::{map_request_error, missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{ChatMessage, ChatRole, LlmError, LlmResult, ProviderConfig};

/// Default Gemini API base (model name and key are appended per request)
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs);
        Self { config, client }
    }

    fn request_url(&self, api_key: &str) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(GEMINI_API_BASE);
        format!(
            "{}/{}:generateContent?key={}",
            base, self.config.model, api_key
        )
    }

    /// Build the request body for the API.
    ///
    /// Gemini uses "user"/"model" roles; system history entries are folded
    /// into user turns, and the system prompt rides in `systemInstruction`.
    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::Assistant => "model",
                    ChatRole::User | ChatRole::System => "user",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_tokens,
            },
        });

        if let Some(sys) = system {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": sys }],
            });
        }

        body
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
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
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        let body = self.build_request_body(&messages, system.as_deref());

        let response = self
            .client
            .post(self.request_url(api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, "gemini"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_request_error(e, "gemini"))?;

        if !status.is_success() {
            return Err(parse_http_error(status.as_u16(), &text, "gemini"));
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError {
                message: format!("gemini: {}", e),
            })?;

        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "gemini: response has no candidate text".to_string(),
            })
    }

    async fn health_check(&self) -> LlmResult<()> {
        if self.config.api_key.is_none() {
            return Err(missing_api_key_error("gemini"));
        }
        Ok(())
    }
}
