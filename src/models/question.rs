//! Question Models
//!
//! The interview question bank.

use serde::{Deserialize, Serialize};

/// A question in the interview catalog.
///
/// Questions are selected highest priority first, ties broken by lowest id.
/// Edits only affect future selection; answers keep referring to the
/// question row they were recorded against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique question ID
    pub id: i64,
    /// The question text shown to the client
    pub question_text: String,
    /// Free-form category tag, e.g. "personal_life", "financial"
    pub category: String,
    /// Higher priority is asked first
    pub priority: i64,
    /// Required questions gate completion of the free-form interview
    pub is_required: bool,
    /// Inactive questions are never selected
    pub is_active: bool,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
}

/// Fields for creating or editing a question via the admin capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_text: String,
    pub category: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewQuestion {
    pub fn new(text: impl Into<String>, category: impl Into<String>, priority: i64) -> Self {
        Self {
            question_text: text.into(),
            category: category.into(),
            priority,
            is_required: false,
            is_active: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}
