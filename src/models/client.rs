//! Client Models
//!
//! Client records and the vetting status lifecycle.

use serde::{Deserialize, Serialize};

/// Vetting status of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Awaiting manual review
    Pending,
    /// Approved for services
    Approved,
    /// Rejected
    Rejected,
    /// Interview currently underway
    InProgress,
    /// Interview finished, evaluation not yet complete
    InterviewCompleted,
    /// Flagged for closer manual review
    UnderReview,
}

impl ClientStatus {
    /// Get the string form for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::InProgress => "in_progress",
            Self::InterviewCompleted => "interview_completed",
            Self::UnderReview => "under_review",
        }
    }

    /// Parse from the stored string; unknown input falls back to Pending
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "in_progress" | "inprogress" => Self::InProgress,
            "interview_completed" | "interviewcompleted" => Self::InterviewCompleted,
            "under_review" | "underreview" => Self::UnderReview,
            _ => Self::Pending,
        }
    }
}

/// A client being vetted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client ID
    pub id: i64,
    /// Email address, unique across clients
    pub email: String,
    /// Optional login name
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Current vetting status
    pub status: ClientStatus,
    /// Overall evaluation score in [0, 100]
    pub overall_score: f64,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
    /// Last updated timestamp (RFC 3339)
    pub updated_at: String,
}
