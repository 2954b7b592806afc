//! Evaluation Criteria Models

use serde::{Deserialize, Serialize};

/// A weighted evaluation criterion used by the scoring engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    /// Unique criterion ID
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Free-form grouping tag
    pub category: Option<String>,
    /// Relative weight in the overall score; defaults to 1.0
    pub weight: f64,
    /// Inactive criteria are skipped during evaluation
    pub is_active: bool,
    /// Guideline text handed to the scoring capability
    pub evaluation_prompt: Option<String>,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
}
