//! Conversation Engines
//!
//! Two engines drive interviews over the same store. The structured engine
//! walks the question bank literally; the free-form interviewer lets the
//! language model weave the bank in as a topic checklist. The
//! `interview_mode` setting picks one per deployment; they are never
//! composed.

pub mod engine;
pub mod interviewer;

use serde::{Deserialize, Serialize};

pub use engine::InterviewEngine;
pub use interviewer::AiInterviewer;

/// Result of starting an interview conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartConversationResponse {
    pub conversation_id: i64,
    pub client_id: i64,
    /// Assistant greeting, already persisted as the first message
    pub greeting: String,
    /// First question, echoed for caller convenience (structured engine only)
    pub first_question_id: Option<i64>,
    pub first_question_text: Option<String>,
}

/// Treat blank or whitespace-only input as absent
pub(crate) fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

/// Result of processing one user message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Id of the persisted assistant reply
    pub message_id: i64,
    pub reply: String,
    pub conversation_ended: bool,
    pub total_messages: i64,
    pub current_question_id: Option<i64>,
    pub waiting_for_additional_info: bool,
}
