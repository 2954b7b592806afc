//! LLM Provider Trait
//!
//! Defines the common interface for all LLM providers.

use std::sync::Arc;

use async_trait::async_trait;

use super::anthropic::AnthropicProvider;
use super::gemini::GeminiProvider;
use super::mock::MockProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAIProvider;
use super::types::{ChatMessage, LlmError, LlmResult, ProviderConfig, ProviderType};

/// Trait that all LLM providers must implement.
///
/// The interface is deliberately small: the vetting engine treats the model
/// as an opaque function from (history, instruction) to text. Callers are
/// responsible for treating malformed or empty responses as soft failures.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Send a conversation history and get a complete text response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history in chronological order
    /// * `system` - Optional system prompt
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        system: Option<String>,
    ) -> LlmResult<String>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For API providers, this validates the API key is present.
    /// For Ollama, this checks if the server is running.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

/// Build a provider from its configuration.
pub fn create_provider(config: ProviderConfig) -> Arc<dyn LlmProvider> {
    match config.provider {
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)),
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)),
        ProviderType::Gemini => Arc::new(GeminiProvider::new(config)),
        ProviderType::Ollama => Arc::new(OllamaProvider::new(config)),
        ProviderType::Mock => Arc::new(MockProvider::new()),
    }
}

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to map HTTP error status codes to `LlmError`
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Map a reqwest error to `LlmError`, distinguishing timeouts from
/// connection failures.
pub fn map_request_error(err: reqwest::Error, provider: &str) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout {
            message: format!("{}: {}", provider, err),
        }
    } else if err.is_connect() {
        LlmError::ProviderUnavailable {
            message: format!("{}: {}", provider, err),
        }
    } else {
        LlmError::NetworkError {
            message: format!("{}: {}", provider, err),
        }
    }
}
