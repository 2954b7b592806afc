//! Red Flag Models
//!
//! The red-flag catalog and recorded detections against clients.

use serde::{Deserialize, Serialize};

/// Severity of a red flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlagSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RedFlagSeverity {
    /// Get the string form for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse from the stored string; unknown input falls back to Medium
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }
}

/// A red flag definition in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedFlag {
    /// Unique red flag ID
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub severity: RedFlagSeverity,
    /// Inactive flags are skipped by both detection passes
    pub is_active: bool,
    /// Comma-separated keywords for the deterministic pass; None or empty
    /// means keyword detection is skipped for this flag
    pub detection_keywords: Option<String>,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
}

impl RedFlag {
    /// Split the keyword list, dropping empty fragments. Keywords keep their
    /// original casing; matching is the caller's concern.
    pub fn keywords(&self) -> Vec<String> {
        self.detection_keywords
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// A recorded detection of a red flag against a client.
///
/// At most one detection exists per (client, red flag); re-running detection
/// never duplicates rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedFlagDetection {
    pub id: i64,
    pub client_id: i64,
    pub red_flag_id: i64,
    /// Message that triggered the detection, when known
    pub message_id: Option<i64>,
    pub detection_reason: Option<String>,
    /// Detection confidence in [0, 1]
    pub confidence_score: f64,
    /// Detected timestamp (RFC 3339)
    pub detected_at: String,
}
