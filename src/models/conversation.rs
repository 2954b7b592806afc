//! Conversation Models
//!
//! Interview conversations, their transcripts, and recorded answers.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Completed,
    Abandoned,
}

impl ConversationStatus {
    /// Get the string form for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Parse from the stored string; unknown input falls back to Abandoned
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "active" => Self::Active,
            "completed" => Self::Completed,
            _ => Self::Abandoned,
        }
    }
}

/// Author of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// Get the string form for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Capitalized form used when rendering transcripts for the capability
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }

    /// Parse from the stored string; unknown input falls back to System
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::System,
        }
    }
}

/// One interview conversation belonging to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: i64,
    /// Owning client
    pub client_id: i64,
    /// Started timestamp (RFC 3339)
    pub started_at: String,
    /// Ended timestamp, set when the conversation completes
    pub ended_at: Option<String>,
    pub status: ConversationStatus,
    /// Running count of every persisted message, user and assistant alike
    pub total_messages: i64,
    /// Question currently awaiting an answer (structured flow)
    pub current_question_id: Option<i64>,
    /// True only while the current question has been answered once but the
    /// additional-info sub-dialog has not been resolved
    pub waiting_for_additional_info: bool,
}

/// A single message in a conversation transcript.
///
/// Row ids are strictly increasing, so ordering by id yields transcript order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
}

/// An answer recorded for one question within a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub id: i64,
    pub conversation_id: i64,
    pub question_id: i64,
    /// Primary answer text
    pub answer: String,
    /// Extra detail supplied through the additional-info sub-dialog
    pub additional_info: Option<String>,
    /// Answered timestamp (RFC 3339)
    pub answered_at: String,
}

/// Ledger entry recording that the free-form interviewer wove a bank
/// question into the conversation (asked, not necessarily answered)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskedQuestion {
    pub id: i64,
    pub conversation_id: i64,
    pub question_id: i64,
    pub asked_at: String,
}
