//! Dossier Extractor
//!
//! Converts finished structured answers, or recent free-text exchanges, into
//! dossier entries. The free-text pass is best-effort: a malformed capability
//! response is logged and dropped, never surfaced to the conversation flow.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};
use vetting_llm::{ChatMessage, LlmProvider};

use crate::models::{DossierCategory, Message};
use crate::storage::Database;
use crate::utils::error::AppResult;

/// Number of trailing messages supplied to the extraction capability
const EXTRACTION_WINDOW: i64 = 10;

const EXTRACTION_PROMPT: &str = r#"Analyze the following conversation and extract key information about the person being interviewed.
Format the response as JSON with categories: personal_life, business_life, family, childhood, education, values, goals, background, financial.
Each category should contain key-value pairs of extracted information with confidence scores (0-1).

Example format:
{
  "personal_life": [{"key": "marital_status", "value": "married", "confidence": 0.9}],
  "business_life": [{"key": "current_role", "value": "CEO", "confidence": 0.95}]
}

Conversation:
"#;

/// One fact as returned by the extraction capability
#[derive(Debug, Deserialize)]
struct ExtractedFact {
    key: String,
    value: String,
    confidence: f64,
}

/// Extracts dossier entries from interviews.
pub struct DossierExtractor {
    db: Database,
    provider: Arc<dyn LlmProvider>,
}

impl DossierExtractor {
    pub fn new(db: Database, provider: Arc<dyn LlmProvider>) -> Self {
        Self { db, provider }
    }

    /// Finalize a completed structured interview into dossier entries.
    ///
    /// Every recorded answer becomes an entry keyed `question_<id>` at
    /// confidence 1.0 under the question's category; additional info becomes
    /// a `question_<id>_additional` sibling. Already-present keys are left
    /// alone so re-finalizing is harmless.
    pub fn finalize_conversation(db: &Database, conversation_id: i64) -> AppResult<()> {
        let Some(conversation) = db.get_conversation(conversation_id)? else {
            return Ok(());
        };
        let answers = db.answers_for_conversation(conversation_id)?;

        for (answer, question) in answers {
            let category = DossierCategory::from_question_category(&question.category);

            let key = format!("question_{}", answer.question_id);
            if db
                .find_dossier_entry(conversation.client_id, category, &key)?
                .is_none()
            {
                db.insert_dossier_entry(
                    conversation.client_id,
                    category,
                    &key,
                    &answer.answer,
                    1.0,
                    None,
                )?;
            }

            if let Some(info) = answer.additional_info.as_deref() {
                if !info.trim().is_empty() {
                    let key = format!("question_{}_additional", answer.question_id);
                    if db
                        .find_dossier_entry(conversation.client_id, category, &key)?
                        .is_none()
                    {
                        db.insert_dossier_entry(
                            conversation.client_id,
                            category,
                            &key,
                            info,
                            1.0,
                            None,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Extract facts from the tail of a free-form conversation.
    pub async fn extract_from_transcript(
        &self,
        client_id: i64,
        conversation_id: i64,
    ) -> AppResult<()> {
        let recent = self.db.recent_messages(conversation_id, EXTRACTION_WINDOW)?;
        if recent.is_empty() {
            return Ok(());
        }
        let transcript = render_transcript(&recent);
        let prompt = format!("{}{}", EXTRACTION_PROMPT, transcript);

        let response = match self
            .provider
            .complete(vec![ChatMessage::user(prompt)], None)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(client_id, conversation_id, error = %e, "Dossier extraction call failed");
                return Ok(());
            }
        };

        let trimmed = response.trim_start();
        if !trimmed.starts_with('{') {
            warn!(client_id, "Extraction capability returned non-JSON response");
            return Ok(());
        }

        let parsed: HashMap<String, Vec<ExtractedFact>> = match serde_json::from_str(trimmed) {
            Ok(data) => data,
            Err(e) => {
                warn!(client_id, error = %e, "Failed to parse dossier extraction JSON");
                return Ok(());
            }
        };

        let source_message_id = self.db.latest_message_id(conversation_id)?;

        for (category_name, facts) in parsed {
            let category = DossierCategory::from_extracted(&category_name);
            for fact in facts {
                match self
                    .db
                    .find_dossier_entry(client_id, category, &fact.key)?
                {
                    Some(existing) => {
                        // Only a strictly more confident extraction replaces a fact
                        if fact.confidence > existing.confidence_score {
                            self.db.update_dossier_entry(
                                existing.id,
                                &fact.value,
                                fact.confidence,
                                source_message_id,
                            )?;
                        }
                    }
                    None => {
                        self.db.insert_dossier_entry(
                            client_id,
                            category,
                            &fact.key,
                            &fact.value,
                            fact.confidence,
                            source_message_id,
                        )?;
                    }
                }
            }
        }

        debug!(client_id, conversation_id, "Dossier extraction pass finished");
        Ok(())
    }
}

/// Render messages as the `Role: content` lines the prompts expect
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.display_name(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
