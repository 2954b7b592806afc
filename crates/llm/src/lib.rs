//! Vetting LLM
//!
//! Provides a unified interface for interacting with multiple LLM providers:
//! - OpenAI (Chat Completions)
//! - Anthropic Claude (Messages)
//! - Google Gemini (generateContent)
//! - Ollama (local inference)
//! - Mock (scripted responses, no API key)
//!
//! The vetting services depend only on the [`LlmProvider`] trait; the
//! concrete provider is selected by configuration at startup.

pub mod anthropic;
pub mod gemini;
pub mod http_client;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use provider::{create_provider, LlmProvider};
pub use types::*;
