//! Structured Interview Engine Integration Tests
//!
//! Covers the full question-by-question flow: greeting, the additional-info
//! sub-dialog, question advancement, completion, and dossier finalization.

use client_vetting::services::conversation::engine::{
    ADDITIONAL_INFO_PROMPT, ADDITIONAL_INFO_REPROMPT, COMPLETION_MESSAGE,
};
use client_vetting::{
    AppError, ClientStatus, ConversationStatus, Database, DossierCategory, InterviewEngine,
    NewQuestion,
};

// ============================================================================
// Helpers
// ============================================================================

fn two_question_db() -> (Database, i64, i64) {
    let db = Database::new_in_memory().unwrap();
    let q1 = db
        .create_question(&NewQuestion::new("Q1: business situation?", "business_life", 10))
        .unwrap();
    let q2 = db
        .create_question(&NewQuestion::new("Q2: family life?", "family", 5))
        .unwrap();
    (db, q1.id, q2.id)
}

// ============================================================================
// Start
// ============================================================================

#[test]
fn test_start_creates_client_and_greets_with_first_question() {
    let (db, q1, _) = two_question_db();
    let engine = InterviewEngine::new(db.clone());

    let started = engine
        .start_conversation("a@x.com", Some("Ada"), None)
        .unwrap();

    assert_eq!(started.first_question_id, Some(q1));
    assert!(started.greeting.starts_with("Hello Ada!"));
    assert!(started.greeting.ends_with("Q1: business situation?"));

    let client = db.get_client(started.client_id).unwrap().unwrap();
    assert_eq!(client.status, ClientStatus::InProgress);

    let conv = db.get_conversation(started.conversation_id).unwrap().unwrap();
    assert_eq!(conv.total_messages, 1);
    assert_eq!(conv.current_question_id, Some(q1));
    assert!(!conv.waiting_for_additional_info);
}

#[test]
fn test_start_without_name_greets_there() {
    let (db, _, _) = two_question_db();
    let engine = InterviewEngine::new(db);

    let started = engine.start_conversation("a@x.com", None, None).unwrap();
    assert!(started.greeting.starts_with("Hello there!"));
}

#[test]
fn test_start_fails_without_active_questions() {
    let db = Database::new_in_memory().unwrap();
    let engine = InterviewEngine::new(db);

    let err = engine.start_conversation("a@x.com", None, None).unwrap_err();
    assert!(matches!(err, AppError::NoQuestionsConfigured));
}

#[test]
fn test_restart_merges_names_non_destructively() {
    let (db, _, _) = two_question_db();
    let engine = InterviewEngine::new(db.clone());

    let first = engine
        .start_conversation("a@x.com", Some("Ada"), Some("Lovelace"))
        .unwrap();
    // Restart with no names supplied keeps the stored ones
    let second = engine.start_conversation("a@x.com", None, Some("")).unwrap();
    assert_eq!(first.client_id, second.client_id);

    let client = db.get_client(second.client_id).unwrap().unwrap();
    assert_eq!(client.first_name.as_deref(), Some("Ada"));
    assert_eq!(client.last_name.as_deref(), Some("Lovelace"));
    assert!(second.greeting.starts_with("Hello Ada!"));
}

// ============================================================================
// Full scenario: two questions, "no" to both additional-info prompts
// ============================================================================

#[test]
fn test_full_two_question_interview() {
    let (db, q1, q2) = two_question_db();
    let engine = InterviewEngine::new(db.clone());

    let started = engine.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    // Answer Q1 -> additional-info prompt
    let r = engine.process_message(conv_id, "My answer to Q1").unwrap();
    assert_eq!(r.reply, ADDITIONAL_INFO_PROMPT);
    assert!(r.waiting_for_additional_info);
    assert!(!r.conversation_ended);
    assert_eq!(r.total_messages, 3);

    // Decline -> Q2
    let r = engine.process_message(conv_id, "no").unwrap();
    assert_eq!(r.reply, "Q2: family life?");
    assert!(!r.waiting_for_additional_info);
    assert_eq!(r.current_question_id, Some(q2));
    assert_eq!(r.total_messages, 5);

    // Answer Q2 -> prompt again
    let r = engine.process_message(conv_id, "My answer to Q2").unwrap();
    assert_eq!(r.reply, ADDITIONAL_INFO_PROMPT);
    assert_eq!(r.total_messages, 7);

    // Decline -> complete
    let r = engine.process_message(conv_id, "no").unwrap();
    assert_eq!(r.reply, COMPLETION_MESSAGE);
    assert!(r.conversation_ended);
    assert_eq!(r.total_messages, 9);
    assert_eq!(r.current_question_id, None);

    let conv = db.get_conversation(conv_id).unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::Completed);
    assert!(conv.ended_at.is_some());

    let client = db.get_client(started.client_id).unwrap().unwrap();
    assert_eq!(client.status, ClientStatus::InterviewCompleted);

    // Completion finalized the answers into the dossier at confidence 1.0
    let entry = db
        .find_dossier_entry(
            started.client_id,
            DossierCategory::BusinessLife,
            &format!("question_{}", q1),
        )
        .unwrap()
        .unwrap();
    assert_eq!(entry.value, "My answer to Q1");
    assert!((entry.confidence_score - 1.0).abs() < f64::EPSILON);

    assert!(db
        .find_dossier_entry(
            started.client_id,
            DossierCategory::Family,
            &format!("question_{}", q2),
        )
        .unwrap()
        .is_some());

    // A completed conversation rejects further messages
    let err = engine.process_message(conv_id, "hello?").unwrap_err();
    assert!(matches!(err, AppError::ConversationNotActive(_)));
}

// ============================================================================
// Additional-info sub-dialog
// ============================================================================

#[test]
fn test_yes_reprompts_without_persisting() {
    let (db, q1, _) = two_question_db();
    let engine = InterviewEngine::new(db.clone());
    let started = engine.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    engine.process_message(conv_id, "My answer to Q1").unwrap();

    let r = engine.process_message(conv_id, "yes").unwrap();
    assert_eq!(r.reply, ADDITIONAL_INFO_REPROMPT);
    assert!(r.waiting_for_additional_info);
    assert_eq!(r.current_question_id, Some(q1));

    // Still exactly one answer, with no additional info yet
    let answers = db.answers_for_conversation(conv_id).unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].0.additional_info, None);

    // The next message carries the content
    let r = engine.process_message(conv_id, "Here is more detail").unwrap();
    assert!(!r.waiting_for_additional_info);
    assert_eq!(r.reply, "Q2: family life?");

    let answers = db.answers_for_conversation(conv_id).unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(
        answers[0].0.additional_info.as_deref(),
        Some("Here is more detail")
    );
}

#[test]
fn test_no_never_creates_an_answer_row() {
    let (db, _, _) = two_question_db();
    let engine = InterviewEngine::new(db.clone());
    let started = engine.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    engine.process_message(conv_id, "My answer to Q1").unwrap();
    engine.process_message(conv_id, "no").unwrap();

    let answers = db.answers_for_conversation(conv_id).unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].0.additional_info, None);
}

#[test]
fn test_additional_info_lands_in_dossier_on_completion() {
    let (db, q1, _) = two_question_db();
    let engine = InterviewEngine::new(db.clone());
    let started = engine.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    engine.process_message(conv_id, "My answer to Q1").unwrap();
    engine.process_message(conv_id, "Some extra context").unwrap();
    engine.process_message(conv_id, "My answer to Q2").unwrap();
    let r = engine.process_message(conv_id, "no").unwrap();
    assert!(r.conversation_ended);

    let additional = db
        .find_dossier_entry(
            started.client_id,
            DossierCategory::BusinessLife,
            &format!("question_{}_additional", q1),
        )
        .unwrap()
        .unwrap();
    assert_eq!(additional.value, "Some extra context");
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_question_sequence_has_no_repeats() {
    let db = Database::new_in_memory().unwrap();
    for i in 0..4 {
        db.create_question(&NewQuestion::new(format!("Q{}", i), "values", 5))
            .unwrap();
    }
    let engine = InterviewEngine::new(db.clone());
    let started = engine.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    let mut seen = vec![started.first_question_id.unwrap()];
    loop {
        engine.process_message(conv_id, "answer").unwrap();
        let r = engine.process_message(conv_id, "no").unwrap();
        if r.conversation_ended {
            break;
        }
        let current = r.current_question_id.unwrap();
        assert!(!seen.contains(&current), "question repeated");
        seen.push(current);
    }
    assert_eq!(seen.len(), 4);
}

#[test]
fn test_every_branch_adds_exactly_two_messages() {
    let (db, _, _) = two_question_db();
    let engine = InterviewEngine::new(db.clone());
    let started = engine.start_conversation("a@x.com", None, None).unwrap();
    let conv_id = started.conversation_id;

    let mut expected = 1;
    for text in ["My answer to Q1", "yes", "extra detail", "My answer to Q2", "no"] {
        let r = engine.process_message(conv_id, text).unwrap();
        expected += 2;
        assert_eq!(r.total_messages, expected);
    }
}

#[test]
fn test_unknown_conversation_is_an_error() {
    let (db, _, _) = two_question_db();
    let engine = InterviewEngine::new(db);

    let err = engine.process_message(999, "hello").unwrap_err();
    assert!(matches!(err, AppError::ConversationNotFound(999)));
}
