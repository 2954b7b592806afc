//! Scoring Engine
//!
//! Weighted-criteria evaluation over a client's full message history, with a
//! red-flag penalty and a score-to-status mapping. One bad criterion response
//! degrades to a neutral score; it never fails the whole evaluation.

use std::sync::Arc;

use tracing::{info, warn};
use vetting_llm::{ChatMessage, LlmProvider};

use crate::models::ClientStatus;
use crate::services::dossier::render_transcript;
use crate::storage::Database;
use crate::utils::error::{AppError, AppResult};

/// Neutral score used when a criterion cannot be evaluated
const NEUTRAL_SCORE: f64 = 50.0;

/// Penalty per red-flag detection, capped at `MAX_PENALTY`
const PENALTY_PER_FLAG: f64 = 5.0;
const MAX_PENALTY: f64 = 30.0;

/// Evaluates clients against the weighted criteria catalog.
pub struct ScoringEngine {
    db: Database,
    provider: Arc<dyn LlmProvider>,
}

impl ScoringEngine {
    pub fn new(db: Database, provider: Arc<dyn LlmProvider>) -> Self {
        Self { db, provider }
    }

    /// Score a client and persist the result.
    ///
    /// Returns the final overall score in [0, 100]. Fails only when the
    /// client does not exist.
    pub async fn evaluate_client(&self, client_id: i64) -> AppResult<f64> {
        let client = self
            .db
            .get_client(client_id)?
            .ok_or(AppError::ClientNotFound(client_id))?;

        let messages = self.db.messages_for_client(client_id)?;
        let transcript = render_transcript(&messages);

        let criteria = self.db.list_active_criteria()?;

        let mut total_score = 0.0;
        let mut total_weight = 0.0;
        for criterion in &criteria {
            let Some(prompt) = criterion.evaluation_prompt.as_deref().filter(|p| !p.is_empty())
            else {
                continue;
            };
            let score = self.score_criterion(&transcript, &criterion.name, prompt).await;
            total_score += score * criterion.weight;
            total_weight += criterion.weight;
        }

        let mut overall = if total_weight > 0.0 {
            total_score / total_weight
        } else {
            NEUTRAL_SCORE
        };

        let flag_count = self.db.detection_count(client_id)?;
        if flag_count > 0 {
            overall -= (flag_count as f64 * PENALTY_PER_FLAG).min(MAX_PENALTY);
        }
        overall = overall.clamp(0.0, 100.0);

        let status = if overall >= 70.0 {
            ClientStatus::Approved
        } else if overall < 50.0 || flag_count >= 2 {
            ClientStatus::Rejected
        } else {
            ClientStatus::Pending
        };

        self.db.update_client_score(client.id, overall)?;
        self.db.update_client_status(client.id, status)?;

        info!(
            client_id,
            score = overall,
            status = status.as_str(),
            "Client evaluation completed"
        );
        Ok(overall)
    }

    /// Ask the capability to score one criterion; degrade to neutral on any
    /// failure or unparseable reply.
    async fn score_criterion(&self, transcript: &str, name: &str, guideline: &str) -> f64 {
        let prompt = format!(
            "Evaluate the following conversation based on the criterion: {}\n\nEvaluation guideline: {}\n\nReturn ONLY a score between 0 and 100 (integer). No explanation, just the number.\n\nConversation:\n{}",
            name, guideline, transcript
        );

        let response = match self
            .provider
            .complete(vec![ChatMessage::user(prompt)], None)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(criterion = name, error = %e, "Criterion evaluation call failed");
                return NEUTRAL_SCORE;
            }
        };

        match response.trim().parse::<f64>() {
            Ok(score) => score.clamp(0.0, 100.0),
            Err(_) => {
                warn!(
                    criterion = name,
                    response, "Failed to parse criterion score response"
                );
                NEUTRAL_SCORE
            }
        }
    }
}
