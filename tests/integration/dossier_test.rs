//! Dossier Extraction Integration Tests

use std::sync::Arc;

use vetting_llm::MockProvider;

use client_vetting::{Database, DossierCategory, DossierExtractor, MessageRole, NewQuestion};

// ============================================================================
// Helpers
// ============================================================================

fn db_with_conversation() -> (Database, i64, i64) {
    let db = Database::new_in_memory().unwrap();
    let client = db.create_client("a@x.com", None, None, None).unwrap();
    let conv = db.create_conversation(client.id).unwrap();
    db.record_message(conv.id, MessageRole::Assistant, "Tell me about yourself.")
        .unwrap();
    db.record_message(conv.id, MessageRole::User, "I'm married and run a bakery.")
        .unwrap();
    (db, client.id, conv.id)
}

fn extractor(db: &Database, responses: Vec<&str>) -> DossierExtractor {
    DossierExtractor::new(db.clone(), Arc::new(MockProvider::with_responses(responses)))
}

// ============================================================================
// Free-text extraction
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_extracts_facts_from_json_response() {
    let (db, client_id, conv_id) = db_with_conversation();
    let response = r#"{
        "personal_life": [{"key": "marital_status", "value": "married", "confidence": 0.9}],
        "business_life": [{"key": "current_role", "value": "bakery owner", "confidence": 0.95}]
    }"#;
    let extractor = extractor(&db, vec![response]);

    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();

    let entry = db
        .find_dossier_entry(client_id, DossierCategory::PersonalLife, "marital_status")
        .unwrap()
        .unwrap();
    assert_eq!(entry.value, "married");
    assert!((entry.confidence_score - 0.9).abs() < 1e-9);
    // Back-reference points at the newest message of the conversation
    assert_eq!(entry.source_message_id, db.latest_message_id(conv_id).unwrap());

    assert!(db
        .find_dossier_entry(client_id, DossierCategory::BusinessLife, "current_role")
        .unwrap()
        .is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_overwrites_only_on_strictly_higher_confidence() {
    let (db, client_id, conv_id) = db_with_conversation();
    let extractor = extractor(
        &db,
        vec![
            r#"{"personal_life": [{"key": "marital_status", "value": "married", "confidence": 0.9}]}"#,
            r#"{"personal_life": [{"key": "marital_status", "value": "divorced", "confidence": 0.5}]}"#,
            r#"{"personal_life": [{"key": "marital_status", "value": "married", "confidence": 0.9}]}"#,
            r#"{"personal_life": [{"key": "marital_status", "value": "remarried", "confidence": 0.97}]}"#,
        ],
    );

    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();

    // Lower confidence: ignored
    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();
    let entry = db
        .find_dossier_entry(client_id, DossierCategory::PersonalLife, "marital_status")
        .unwrap()
        .unwrap();
    assert_eq!(entry.value, "married");

    // Equal confidence: still ignored (strictly greater required)
    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();
    let entry = db
        .find_dossier_entry(client_id, DossierCategory::PersonalLife, "marital_status")
        .unwrap()
        .unwrap();
    assert!((entry.confidence_score - 0.9).abs() < 1e-9);

    // Higher confidence: replaced
    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();
    let entry = db
        .find_dossier_entry(client_id, DossierCategory::PersonalLife, "marital_status")
        .unwrap()
        .unwrap();
    assert_eq!(entry.value, "remarried");
    assert!((entry.confidence_score - 0.97).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_json_response_is_skipped_silently() {
    let (db, client_id, conv_id) = db_with_conversation();
    let extractor = extractor(&db, vec!["Sorry, I can't help with that."]);

    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();
    assert!(db.dossier_for_client(client_id).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_json_is_skipped_silently() {
    let (db, client_id, conv_id) = db_with_conversation();
    let extractor = extractor(&db, vec![r#"{"personal_life": "not an array"}"#]);

    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();
    assert!(db.dossier_for_client(client_id).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_category_lands_in_other() {
    let (db, client_id, conv_id) = db_with_conversation();
    let extractor = extractor(
        &db,
        vec![r#"{"hobbies": [{"key": "sport", "value": "rowing", "confidence": 0.8}]}"#],
    );

    extractor.extract_from_transcript(client_id, conv_id).await.unwrap();
    assert!(db
        .find_dossier_entry(client_id, DossierCategory::Other, "sport")
        .unwrap()
        .is_some());
}

// ============================================================================
// Structured finalization
// ============================================================================

#[test]
fn test_finalize_is_idempotent() {
    let db = Database::new_in_memory().unwrap();
    let question = db
        .create_question(&NewQuestion::new("Core values?", "values", 5))
        .unwrap();
    let client = db.create_client("a@x.com", None, None, None).unwrap();
    let conv = db.create_conversation(client.id).unwrap();
    let answer_id = db.record_answer(conv.id, question.id, "Honesty").unwrap();
    db.set_additional_info(answer_id, Some("And curiosity")).unwrap();

    DossierExtractor::finalize_conversation(&db, conv.id).unwrap();
    DossierExtractor::finalize_conversation(&db, conv.id).unwrap();

    let entries = db.dossier_for_client(client.id).unwrap();
    assert_eq!(entries.len(), 2);

    let main = db
        .find_dossier_entry(
            client.id,
            DossierCategory::Values,
            &format!("question_{}", question.id),
        )
        .unwrap()
        .unwrap();
    assert_eq!(main.value, "Honesty");
    assert!((main.confidence_score - 1.0).abs() < f64::EPSILON);

    let additional = db
        .find_dossier_entry(
            client.id,
            DossierCategory::Values,
            &format!("question_{}_additional", question.id),
        )
        .unwrap()
        .unwrap();
    assert_eq!(additional.value, "And curiosity");
}
