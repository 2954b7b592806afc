//! Structured Interview Engine
//!
//! Walks the question bank question by question. After each answer the
//! client is offered a chance to add more detail (the yes/no sub-dialog);
//! once every active question has an answer the conversation completes and
//! the answers are finalized into the dossier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::models::{ClientStatus, Conversation, ConversationStatus, MessageRole, Question};
use crate::services::conversation::{non_empty, SendMessageResponse, StartConversationResponse};
use crate::services::dossier::DossierExtractor;
use crate::storage::Database;
use crate::utils::error::{AppError, AppResult};

/// Fixed prompt after every primary answer
pub const ADDITIONAL_INFO_PROMPT: &str =
    "Would you like to provide any additional information? (yes/no)";

/// Re-prompt when the client answers "yes"
pub const ADDITIONAL_INFO_REPROMPT: &str =
    "Please provide any additional information you'd like to share:";

/// Final message once every question has been answered
pub const COMPLETION_MESSAGE: &str = "Thank you for answering all the questions! Your responses have been saved. We'll review your information and get back to you soon.";

/// The structured conversation engine.
///
/// All state lives in the database; the engine itself only carries the
/// per-conversation locks that serialize concurrent `process_message` calls
/// on the same conversation.
pub struct InterviewEngine {
    db: Database,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl InterviewEngine {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn conversation_lock(&self, conversation_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(conversation_id).or_default().clone()
    }

    /// Once a conversation is no longer active its lock is dead weight
    fn discard_lock(&self, conversation_id: i64) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(&conversation_id);
    }

    /// Start a new interview.
    ///
    /// Finds or creates the client by email, marks them in progress, opens a
    /// conversation, and asks the first question inside the greeting. Fails
    /// with `NoQuestionsConfigured` when the question bank has no active
    /// entries.
    pub fn start_conversation(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<StartConversationResponse> {
        let first_question = self
            .db
            .first_active_question()?
            .ok_or(AppError::NoQuestionsConfigured)?;

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
                info!(client_id = client.id, "Created new client for interview");
                client
            }
        };

        let conversation = self.db.create_conversation(client.id)?;
        self.db
            .set_current_question(conversation.id, Some(first_question.id))?;

        let greeting_name = client.first_name.as_deref().filter(|n| !n.is_empty());
        let greeting = format!(
            "Hello {}! Thank you for your interest. I'll be asking you a series of questions to get to know you better. Let's start:\n\n{}",
            greeting_name.unwrap_or("there"),
            first_question.question_text
        );
        self.db
            .record_message(conversation.id, MessageRole::Assistant, &greeting)?;

        info!(
            conversation_id = conversation.id,
            client_id = client.id,
            "Started structured interview"
        );

        Ok(StartConversationResponse {
            conversation_id: conversation.id,
            client_id: client.id,
            greeting,
            first_question_id: Some(first_question.id),
            first_question_text: Some(first_question.question_text),
        })
    }

    /// Process one inbound message.
    ///
    /// Every call persists exactly two messages: the user's text and the
    /// engine's reply, whichever branch is taken.
    pub fn process_message(
        &self,
        conversation_id: i64,
        user_text: &str,
    ) -> AppResult<SendMessageResponse> {
        let lock = self.conversation_lock(conversation_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or(AppError::ConversationNotFound(conversation_id))?;

        if conversation.status != ConversationStatus::Active {
            self.discard_lock(conversation_id);
            return Err(AppError::ConversationNotActive(conversation_id));
        }

        self.db
            .record_message(conversation_id, MessageRole::User, user_text)?;

        let mut ended = false;
        let reply = if conversation.waiting_for_additional_info {
            match user_text.trim().to_lowercase().as_str() {
                // Pure re-prompt: nothing persisted, state unchanged. The next
                // inbound message carries the actual additional info.
                "yes" | "y" => ADDITIONAL_INFO_REPROMPT.to_string(),
                "no" | "n" => {
                    self.attach_additional_info(&conversation, None)?;
                    self.advance(&conversation, &mut ended)?
                }
                _ => {
                    self.attach_additional_info(&conversation, Some(user_text))?;
                    self.advance(&conversation, &mut ended)?
                }
            }
        } else {
            let question_id = conversation
                .current_question_id
                .ok_or_else(|| AppError::internal("Current question not set"))?;
            self.db.record_answer(conversation_id, question_id, user_text)?;
            self.db.set_waiting_for_additional_info(conversation_id, true)?;
            ADDITIONAL_INFO_PROMPT.to_string()
        };

        let assistant_msg = self
            .db
            .record_message(conversation_id, MessageRole::Assistant, &reply)?;

        let conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or(AppError::ConversationNotFound(conversation_id))?;

        if ended {
            self.discard_lock(conversation_id);
        }

        Ok(SendMessageResponse {
            message_id: assistant_msg.id,
            reply,
            conversation_ended: ended,
            total_messages: conversation.total_messages,
            current_question_id: conversation.current_question_id,
            waiting_for_additional_info: conversation.waiting_for_additional_info,
        })
    }

    /// Attach (or explicitly clear) additional info on the latest answer for
    /// the current question.
    fn attach_additional_info(
        &self,
        conversation: &Conversation,
        info: Option<&str>,
    ) -> AppResult<()> {
        let Some(question_id) = conversation.current_question_id else {
            warn!(
                conversation_id = conversation.id,
                "Additional-info reply with no current question"
            );
            return Ok(());
        };
        match self
            .db
            .latest_answer_for_question(conversation.id, question_id)?
        {
            Some(answer) => self.db.set_additional_info(answer.id, info),
            None => {
                warn!(
                    conversation_id = conversation.id,
                    question_id, "Additional-info reply with no recorded answer"
                );
                Ok(())
            }
        }
    }

    /// Move to the next unanswered question, or complete the interview.
    fn advance(&self, conversation: &Conversation, ended: &mut bool) -> AppResult<String> {
        self.db
            .set_waiting_for_additional_info(conversation.id, false)?;

        match self.db.next_unanswered_question(conversation.id)? {
            Some(next) => {
                self.db
                    .set_current_question(conversation.id, Some(next.id))?;
                Ok(next.question_text)
            }
            None => {
                *ended = true;
                self.complete(conversation)?;
                Ok(COMPLETION_MESSAGE.to_string())
            }
        }
    }

    fn complete(&self, conversation: &Conversation) -> AppResult<()> {
        self.db.complete_conversation(conversation.id)?;
        self.db
            .update_client_status(conversation.client_id, ClientStatus::InterviewCompleted)?;
        DossierExtractor::finalize_conversation(&self.db, conversation.id)?;
        info!(
            conversation_id = conversation.id,
            client_id = conversation.client_id,
            "Structured interview completed"
        );
        Ok(())
    }

    /// Echo the text of the question a conversation is currently on
    pub fn current_question(&self, conversation_id: i64) -> AppResult<Option<Question>> {
        let conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or(AppError::ConversationNotFound(conversation_id))?;
        match conversation.current_question_id {
            Some(id) => self.db.get_question(id),
            None => Ok(None),
        }
    }
}
