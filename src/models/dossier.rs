//! Dossier Models
//!
//! Structured facts accumulated about a client across their interviews.

use serde::{Deserialize, Serialize};

/// Section of the dossier an extracted fact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DossierCategory {
    PersonalLife,
    BusinessLife,
    Family,
    Childhood,
    Education,
    Values,
    Goals,
    Background,
    Financial,
    Other,
}

impl DossierCategory {
    /// Get the string form for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalLife => "personal_life",
            Self::BusinessLife => "business_life",
            Self::Family => "family",
            Self::Childhood => "childhood",
            Self::Education => "education",
            Self::Values => "values",
            Self::Goals => "goals",
            Self::Background => "background",
            Self::Financial => "financial",
            Self::Other => "other",
        }
    }

    /// Parse from the stored string; unknown input falls back to Other
    pub fn parse(s: &str) -> Self {
        Self::from_question_category(s)
    }

    /// Map a question-bank category tag to a dossier category.
    ///
    /// Fixed lookup table; anything unmapped lands in Other.
    pub fn from_question_category(category: &str) -> Self {
        match category.trim().to_lowercase().as_str() {
            "personal_life" => Self::PersonalLife,
            "business_life" => Self::BusinessLife,
            "family" => Self::Family,
            "childhood" => Self::Childhood,
            "education" => Self::Education,
            "values" => Self::Values,
            "goals" => Self::Goals,
            "background" => Self::Background,
            "financial" => Self::Financial,
            _ => Self::Other,
        }
    }

    /// Map a category name returned by the extraction capability.
    ///
    /// The capability is prompted with snake_case names but models drift
    /// ("personalLife", "Personal_Life"), so underscores are stripped before
    /// the case-insensitive comparison. This table is deliberately explicit
    /// rather than a generic normalization.
    pub fn from_extracted(category: &str) -> Self {
        match category.replace('_', "").to_lowercase().as_str() {
            "personallife" => Self::PersonalLife,
            "businesslife" => Self::BusinessLife,
            "family" => Self::Family,
            "childhood" => Self::Childhood,
            "education" => Self::Education,
            "values" => Self::Values,
            "goals" => Self::Goals,
            "background" => Self::Background,
            "financial" => Self::Financial,
            _ => Self::Other,
        }
    }
}

/// One extracted fact about a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierEntry {
    /// Unique entry ID
    pub id: i64,
    /// Owning client
    pub client_id: i64,
    pub category: DossierCategory,
    /// Key identifying the fact within (client, category); structured
    /// answers use synthesized `question_<id>` / `question_<id>_additional`
    pub key_name: String,
    pub value: String,
    /// Extraction confidence in [0, 1]; structured answers are 1.0
    pub confidence_score: f64,
    /// Message the fact was extracted from, when known
    pub source_message_id: Option<i64>,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
    /// Last updated timestamp (RFC 3339)
    pub updated_at: String,
}
