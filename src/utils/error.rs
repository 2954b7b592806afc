//! Error Handling
//!
//! Unified error types for the vetting engine.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// LLM capability errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// No active questions exist at interview start
    #[error("No active questions found. Please configure questions in the admin panel.")]
    NoQuestionsConfigured,

    /// Conversation lookup failed
    #[error("Conversation not found: {0}")]
    ConversationNotFound(i64),

    /// A message arrived for a conversation that is not active
    #[error("Conversation is not active: {0}")]
    ConversationNotActive(i64),

    /// Client lookup failed
    #[error("Client not found: {0}")]
    ClientNotFound(i64),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<vetting_llm::LlmError> for AppError {
    fn from(err: vetting_llm::LlmError) -> Self {
        Self::Llm(err.to_string())
    }
}
