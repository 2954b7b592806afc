//! Free-Form AI Interviewer
//!
//! Lets the language model conduct an open-ended interview, using the
//! question bank as a checklist of topics to weave in rather than a script.
//! Extraction and red-flag detection run in the background after every
//! exchange; full evaluation runs once the conversation ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};
use vetting_llm::{ChatMessage, LlmProvider};

use crate::models::{ClientStatus, ConversationStatus, MessageRole, VettingSettings};
use crate::services::conversation::{non_empty, SendMessageResponse, StartConversationResponse};
use crate::services::enrichment::{EnrichmentJob, EnrichmentQueue};
use crate::storage::Database;
use crate::utils::error::{AppError, AppResult};

/// Messages past the configured minimum before the interview may close.
/// Gives the model room to wind down instead of cutting off mid-thought.
const CLOSE_GRACE_MESSAGES: i64 = 5;

/// Reply used when the capability call fails mid-conversation
const FALLBACK_REPLY: &str =
    "Thank you for sharing that. Could you tell me a little more about it?";

pub struct AiInterviewer {
    db: Database,
    provider: Arc<dyn LlmProvider>,
    enrichment: EnrichmentQueue,
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl AiInterviewer {
    pub fn new(db: Database, provider: Arc<dyn LlmProvider>, enrichment: EnrichmentQueue) -> Self {
        Self {
            db,
            provider,
            enrichment,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn conversation_lock(&self, conversation_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(conversation_id).or_default().clone()
    }

    /// Once a conversation is no longer active its lock is dead weight
    fn discard_lock(&self, conversation_id: i64) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(&conversation_id);
    }

    /// Open a conversation with a generic greeting; no question is echoed.
    pub fn start_conversation(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<StartConversationResponse> {
        let client = match self.db.get_client_by_email(email)? {
            Some(existing) => {
                // Merge names non-destructively: only overwrite with non-empty input
                let merged_first = non_empty(first_name)
                    .map(str::to_string)
                    .or(existing.first_name.clone());
                let merged_last = non_empty(last_name)
                    .map(str::to_string)
                    .or(existing.last_name.clone());
                self.db.update_client_profile(
                    existing.id,
                    existing.username.as_deref(),
                    merged_first.as_deref(),
                    merged_last.as_deref(),
                )?;
                self.db
                    .update_client_status(existing.id, ClientStatus::InProgress)?;
                self.db
                    .get_client(existing.id)?
                    .ok_or(AppError::ClientNotFound(existing.id))?
            }
            None => {
                let client = self
                    .db
                    .create_client(email, None, non_empty(first_name), non_empty(last_name))?;
                self.db
                    .update_client_status(client.id, ClientStatus::InProgress)?;
                client
            }
        };

        let conversation = self.db.create_conversation(client.id)?;

        let greeting_name = client.first_name.as_deref().filter(|n| !n.is_empty());
        let greeting = format!(
            "Hello {}! Thank you for your interest. I'd love to get to know you better. To start, could you tell me a bit about yourself?",
            greeting_name.unwrap_or("there")
        );
        self.db
            .record_message(conversation.id, MessageRole::Assistant, &greeting)?;

        info!(
            conversation_id = conversation.id,
            client_id = client.id,
            "Started free-form interview"
        );

        Ok(StartConversationResponse {
            conversation_id: conversation.id,
            client_id: client.id,
            greeting,
            first_question_id: None,
            first_question_text: None,
        })
    }

    /// Process one inbound message through the capability.
    pub async fn process_message(
        &self,
        conversation_id: i64,
        user_text: &str,
    ) -> AppResult<SendMessageResponse> {
        let lock = self.conversation_lock(conversation_id);
        let _guard = lock.lock().await;

        let conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or(AppError::ConversationNotFound(conversation_id))?;

        if conversation.status != ConversationStatus::Active {
            self.discard_lock(conversation_id);
            return Err(AppError::ConversationNotActive(conversation_id));
        }

        let settings = VettingSettings::load(&self.db)?;

        self.db
            .record_message(conversation_id, MessageRole::User, user_text)?;

        let next_question = self.db.next_unasked_question(conversation_id)?;
        let system = build_system_prompt(
            &settings.system_prompt,
            next_question.as_ref().map(|q| q.question_text.as_str()),
        );

        let history = self
            .db
            .messages_for_conversation(conversation_id)?
            .into_iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => vetting_llm::ChatRole::User,
                    MessageRole::Assistant => vetting_llm::ChatRole::Assistant,
                    MessageRole::System => vetting_llm::ChatRole::System,
                };
                ChatMessage::new(role, m.content)
            })
            .collect::<Vec<_>>();

        let reply = match self.provider.complete(history, Some(system)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(conversation_id, error = %e, "Interviewer capability call failed");
                FALLBACK_REPLY.to_string()
            }
        };

        if let Some(question) = &next_question {
            self.db.record_asked_question(conversation_id, question.id)?;
        }

        let assistant_msg = self
            .db
            .record_message(conversation_id, MessageRole::Assistant, &reply)?;

        // Best-effort enrichment on every exchange
        self.enrichment.enqueue(EnrichmentJob::ExtractDossier {
            client_id: conversation.client_id,
            conversation_id,
        });
        self.enrichment.enqueue(EnrichmentJob::DetectRedFlags {
            client_id: conversation.client_id,
            conversation_id,
        });

        let mut conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or(AppError::ConversationNotFound(conversation_id))?;

        let mut ended = false;
        let enough_messages =
            conversation.total_messages >= settings.min_messages_threshold + CLOSE_GRACE_MESSAGES;
        if enough_messages && !self.db.has_unasked_required_questions(conversation_id)? {
            ended = true;
            self.db.complete_conversation(conversation_id)?;
            self.db
                .update_client_status(conversation.client_id, ClientStatus::InterviewCompleted)?;
            if settings.auto_evaluate {
                self.enrichment.enqueue(EnrichmentJob::EvaluateClient {
                    client_id: conversation.client_id,
                });
            }
            conversation = self
                .db
                .get_conversation(conversation_id)?
                .ok_or(AppError::ConversationNotFound(conversation_id))?;
            info!(
                conversation_id,
                client_id = conversation.client_id,
                "Free-form interview completed"
            );
        }

        if ended {
            self.discard_lock(conversation_id);
        }

        Ok(SendMessageResponse {
            message_id: assistant_msg.id,
            reply,
            conversation_ended: ended,
            total_messages: conversation.total_messages,
            current_question_id: None,
            waiting_for_additional_info: false,
        })
    }
}

fn build_system_prompt(base: &str, next_question: Option<&str>) -> String {
    let mut prompt = String::from(base);
    if let Some(question) = next_question {
        prompt.push_str(&format!(
            "\n\nNaturally work the following question into the conversation: {}",
            question
        ));
    }
    prompt.push_str("\n\nKeep your replies conversational and concise (2-4 sentences).");
    prompt
}
