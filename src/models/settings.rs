//! Vetting Settings
//!
//! Typed view over the `settings` table. Loaded once per operation so a
//! half-finished admin edit never changes behavior mid-flight.

use serde::{Deserialize, Serialize};
use vetting_llm::{ProviderConfig, ProviderType};

use crate::storage::Database;
use crate::utils::error::AppResult;

/// Which interview engine handles a client's conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    /// Deterministic question-by-question flow
    Structured,
    /// LLM-driven free-form conversation
    FreeForm,
}

impl InterviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::FreeForm => "free_form",
        }
    }

    /// Parse from the stored string; unknown input falls back to Structured
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "free_form" | "freeform" => Self::FreeForm,
            _ => Self::Structured,
        }
    }
}

/// Default system prompt handed to the free-form interviewer.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional interviewer conducting a thorough vetting conversation. Be friendly, empathetic, and ask follow-up questions naturally.";

/// Snapshot of the tunable settings.
///
/// Missing or unparseable rows fall back to the compiled defaults, so a
/// freshly created database behaves the same as a seeded one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VettingSettings {
    /// Capability vendor: openai, anthropic, gemini, ollama, mock
    pub ai_provider: ProviderType,
    pub ai_model: String,
    pub ai_temperature: f64,
    pub ai_max_tokens: u32,
    /// Base persona prompt for the free-form interviewer
    pub system_prompt: String,
    /// Free-form conversations may not complete before this many messages
    pub min_messages_threshold: i64,
    /// Run full evaluation automatically when a conversation completes
    pub auto_evaluate: bool,
    pub interview_mode: InterviewMode,
}

impl Default for VettingSettings {
    fn default() -> Self {
        Self {
            ai_provider: ProviderType::Mock,
            ai_model: "gemini-1.5-flash".to_string(),
            ai_temperature: 0.7,
            ai_max_tokens: 500,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            min_messages_threshold: 20,
            auto_evaluate: true,
            interview_mode: InterviewMode::Structured,
        }
    }
}

impl VettingSettings {
    /// Load the current settings from the database.
    pub fn load(db: &Database) -> AppResult<Self> {
        let defaults = Self::default();
        let get = |key: &str| db.get_setting(key);

        let ai_provider = match get("ai_api_provider")? {
            Some(v) => ProviderType::parse(&v),
            None => defaults.ai_provider,
        };
        let ai_model = get("ai_model")?.unwrap_or(defaults.ai_model);
        let ai_temperature = get("ai_temperature")?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.ai_temperature);
        let ai_max_tokens = get("ai_max_tokens")?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.ai_max_tokens);
        let system_prompt = get("system_prompt")?.unwrap_or(defaults.system_prompt);
        let min_messages_threshold = get("min_messages_threshold")?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.min_messages_threshold);
        let auto_evaluate = get("auto_evaluate")?
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(defaults.auto_evaluate);
        let interview_mode = match get("interview_mode")? {
            Some(v) => InterviewMode::parse(&v),
            None => defaults.interview_mode,
        };

        Ok(Self {
            ai_provider,
            ai_model,
            ai_temperature,
            ai_max_tokens,
            system_prompt,
            min_messages_threshold,
            auto_evaluate,
            interview_mode,
        })
    }

    /// Build the provider configuration for the capability layer.
    ///
    /// API keys live in the environment, not the database.
    pub fn provider_config(&self) -> ProviderConfig {
        let api_key = match self.ai_provider {
            ProviderType::OpenAI => std::env::var("OPENAI_API_KEY").ok(),
            ProviderType::Anthropic => std::env::var("ANTHROPIC_API_KEY").ok(),
            ProviderType::Gemini => std::env::var("GEMINI_API_KEY").ok(),
            ProviderType::Ollama | ProviderType::Mock => None,
        };

        ProviderConfig {
            provider: self.ai_provider,
            api_key,
            model: self.ai_model.clone(),
            temperature: self.ai_temperature as f32,
            max_tokens: self.ai_max_tokens,
            ..ProviderConfig::default()
        }
    }
}
