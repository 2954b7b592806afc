//! Free-Form AI Interviewer Integration Tests
//!
//! Uses the mock provider for every capability call. The enrichment queue
//! runs for real but against the same in-memory database.

use std::sync::Arc;

use vetting_llm::MockProvider;

use client_vetting::{
    AiInterviewer, AppError, ClientStatus, ConversationStatus, Database, EnrichmentQueue,
    MessageRole, NewQuestion,
};

// ============================================================================
// Helpers
// ============================================================================

fn interviewer_with(db: &Database, responses: Vec<&str>) -> AiInterviewer {
    let provider = Arc::new(MockProvider::with_responses(responses));
    // The queue gets its own unscripted mock so background extraction never
    // consumes replies meant for the interviewer
    let queue = EnrichmentQueue::start(db.clone(), Arc::new(MockProvider::new()));
    AiInterviewer::new(db.clone(), provider, queue)
}

fn quick_finish_db() -> Database {
    let db = Database::new_in_memory().unwrap();
    db.create_question(&NewQuestion::new("What are your core values?", "values", 9).required())
        .unwrap();
    // Low threshold so tests finish in a handful of exchanges
    db.set_setting("min_messages_threshold", "3", None).unwrap();
    db.set_setting("auto_evaluate", "false", None).unwrap();
    db
}

// ============================================================================
// Start
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_start_greets_without_echoing_a_question() {
    let db = quick_finish_db();
    let interviewer = interviewer_with(&db, vec![]);

    let started = interviewer
        .start_conversation("a@x.com", Some("Ada"), None)
        .unwrap();

    assert!(started.greeting.starts_with("Hello Ada!"));
    assert_eq!(started.first_question_id, None);
    assert_eq!(started.first_question_text, None);

    let conv = db.get_conversation(started.conversation_id).unwrap().unwrap();
    assert_eq!(conv.total_messages, 1);
    assert_eq!(conv.current_question_id, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_merges_names_non_destructively() {
    let db = quick_finish_db();
    let interviewer = interviewer_with(&db, vec![]);

    let first = interviewer
        .start_conversation("a@x.com", Some("Ada"), None)
        .unwrap();
    // Restart fills in the missing last name; blank input never clobbers
    let second = interviewer
        .start_conversation("a@x.com", Some(""), Some("Lovelace"))
        .unwrap();
    assert_eq!(first.client_id, second.client_id);

    let client = db.get_client(second.client_id).unwrap().unwrap();
    assert_eq!(client.first_name.as_deref(), Some("Ada"));
    assert_eq!(client.last_name.as_deref(), Some("Lovelace"));
    assert!(second.greeting.starts_with("Hello Ada!"));
}

// ============================================================================
// Exchanges
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_exchange_records_both_messages_and_asked_question() {
    let db = quick_finish_db();
    let interviewer = interviewer_with(&db, vec!["Nice to meet you! What drives you?"]);

    let started = interviewer.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    let r = interviewer.process_message(conv_id, "Hi, I'm Ada.").await.unwrap();
    assert_eq!(r.reply, "Nice to meet you! What drives you?");
    assert_eq!(r.total_messages, 3);
    assert!(!r.conversation_ended);

    let messages = db.messages_for_conversation(conv_id).unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[2].role, MessageRole::Assistant);

    // The one required question was woven in and recorded as asked
    assert!(!db.has_unasked_required_questions(conv_id).unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_required_questions_asked_before_optional() {
    let db = Database::new_in_memory().unwrap();
    db.create_question(&NewQuestion::new("Optional high", "goals", 10))
        .unwrap();
    let required = db
        .create_question(&NewQuestion::new("Required low", "financial", 1).required())
        .unwrap();
    db.set_setting("auto_evaluate", "false", None).unwrap();

    let interviewer = interviewer_with(&db, vec!["reply one", "reply two"]);
    let started = interviewer.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    interviewer.process_message(conv_id, "first").await.unwrap();
    interviewer.process_message(conv_id, "second").await.unwrap();

    let next = db.next_unasked_question(conv_id).unwrap();
    assert!(next.is_none(), "both questions should have been asked");

    // Required came first despite lower priority
    let asked = db.asked_questions_for_conversation(conv_id).unwrap();
    assert_eq!(asked.len(), 2);
    assert_eq!(asked[0].question_id, required.id);
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_ends_after_threshold_plus_grace() {
    let db = quick_finish_db();
    let interviewer = interviewer_with(&db, vec![]);

    let started = interviewer.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    // Threshold 3 + grace 5 = 8; totals run 3, 5, 7, 9
    for expected_end in [false, false, false, true] {
        let r = interviewer.process_message(conv_id, "more detail").await.unwrap();
        assert_eq!(r.conversation_ended, expected_end);
    }

    let conv = db.get_conversation(conv_id).unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::Completed);
    assert!(conv.ended_at.is_some());

    let client = db.get_client(started.client_id).unwrap().unwrap();
    assert_eq!(client.status, ClientStatus::InterviewCompleted);

    let err = interviewer.process_message(conv_id, "hello?").await.unwrap_err();
    assert!(matches!(err, AppError::ConversationNotActive(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_does_not_end_while_required_question_pending() {
    let db = Database::new_in_memory().unwrap();
    for i in 0..3 {
        db.create_question(&NewQuestion::new(format!("Required {}", i), "values", 5).required())
            .unwrap();
    }
    db.set_setting("min_messages_threshold", "0", None).unwrap();
    db.set_setting("auto_evaluate", "false", None).unwrap();

    let interviewer = interviewer_with(&db, vec![]);
    let started = interviewer.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    // Total passes 0 + 5 after two exchanges, but three required questions
    // are only exhausted after the third
    let r = interviewer.process_message(conv_id, "one").await.unwrap();
    assert!(!r.conversation_ended);
    let r = interviewer.process_message(conv_id, "two").await.unwrap();
    assert!(!r.conversation_ended);
    let r = interviewer.process_message(conv_id, "three").await.unwrap();
    assert!(r.conversation_ended);
}
