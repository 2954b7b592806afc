//! Red-Flag Detector
//!
//! Two additive passes over a conversation transcript: a deterministic
//! keyword scan and a capability pass that asks the language model to judge
//! the whole exchange. Both are idempotent per (client, red flag).

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};
use vetting_llm::{ChatMessage, LlmProvider};

use crate::services::dossier::render_transcript;
use crate::storage::Database;
use crate::utils::error::AppResult;

/// Fixed confidence for keyword hits
const KEYWORD_CONFIDENCE: f64 = 0.7;

/// One hit as returned by the capability pass
#[derive(Debug, Deserialize)]
struct FlagHit {
    red_flag_index: i64,
    reason: String,
    confidence: f64,
}

/// Scans conversations for configured risk signals.
pub struct RedFlagDetector {
    db: Database,
    provider: Arc<dyn LlmProvider>,
}

impl RedFlagDetector {
    pub fn new(db: Database, provider: Arc<dyn LlmProvider>) -> Self {
        Self { db, provider }
    }

    /// Run both detection passes over one conversation.
    pub async fn detect(&self, client_id: i64, conversation_id: i64) -> AppResult<()> {
        let flags = self.db.list_active_red_flags()?;
        if flags.is_empty() {
            return Ok(());
        }

        let messages = self.db.messages_for_conversation(conversation_id)?;
        let transcript = render_transcript(&messages);
        let transcript_lower = transcript.to_lowercase();

        // Keyword pass
        for flag in &flags {
            for keyword in flag.keywords() {
                if transcript_lower.contains(&keyword.to_lowercase()) {
                    if !self.db.has_detection(client_id, flag.id)? {
                        self.db.insert_detection(
                            client_id,
                            flag.id,
                            None,
                            Some(&format!("Keyword detected: {}", keyword)),
                            KEYWORD_CONFIDENCE,
                        )?;
                        debug!(client_id, flag = %flag.name, keyword, "Keyword red flag detected");
                    }
                    break;
                }
            }
        }

        self.capability_pass(client_id, &flags, &transcript).await
    }

    async fn capability_pass(
        &self,
        client_id: i64,
        flags: &[crate::models::RedFlag],
        transcript: &str,
    ) -> AppResult<()> {
        let numbered = flags
            .iter()
            .enumerate()
            .map(|(i, f)| {
                format!("{}. {}", i + 1, f.description.as_deref().unwrap_or(&f.name))
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Analyze the following conversation for potential red flags.\nRed flags to look for:\n{}\n\nReturn a JSON array of detected red flags with format:\n[{{\"red_flag_index\": 1, \"reason\": \"explanation\", \"confidence\": 0.85}}]\n\nIf no red flags are detected, return an empty array [].\n\nConversation:\n{}",
            numbered, transcript
        );

        let response = match self
            .provider
            .complete(vec![ChatMessage::user(prompt)], None)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(client_id, error = %e, "Red-flag capability call failed");
                return Ok(());
            }
        };

        let trimmed = response.trim_start();
        if !trimmed.starts_with('[') {
            warn!(client_id, "Red-flag capability returned non-JSON response");
            return Ok(());
        }

        let hits: Vec<FlagHit> = match serde_json::from_str(trimmed) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(client_id, error = %e, "Failed to parse red-flag detection JSON");
                return Ok(());
            }
        };

        for hit in hits {
            // 1-based index into the active flag list
            if hit.red_flag_index < 1 || hit.red_flag_index as usize > flags.len() {
                continue;
            }
            let flag = &flags[(hit.red_flag_index - 1) as usize];
            if !self.db.has_detection(client_id, flag.id)? {
                self.db.insert_detection(
                    client_id,
                    flag.id,
                    None,
                    Some(&hit.reason),
                    hit.confidence,
                )?;
                debug!(client_id, flag = %flag.name, "Capability red flag detected");
            }
        }
        Ok(())
    }
}
