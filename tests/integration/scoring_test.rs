//! Scoring Engine Integration Tests

use std::sync::Arc;

use vetting_llm::MockProvider;

use client_vetting::{AppError, ClientStatus, Database, MessageRole, RedFlagSeverity, ScoringEngine};

// ============================================================================
// Helpers
// ============================================================================

fn db_with_client() -> (Database, i64) {
    let db = Database::new_in_memory().unwrap();
    let client = db.create_client("a@x.com", None, None, None).unwrap();
    let conv = db.create_conversation(client.id).unwrap();
    db.record_message(conv.id, MessageRole::User, "I run a stable bakery business.")
        .unwrap();
    (db, client.id)
}

fn engine(db: &Database, responses: Vec<&str>) -> ScoringEngine {
    ScoringEngine::new(db.clone(), Arc::new(MockProvider::with_responses(responses)))
}

fn add_detections(db: &Database, client_id: i64, count: usize) {
    for i in 0..count {
        let flag_id = db
            .create_red_flag(&format!("Flag {}", i), None, RedFlagSeverity::Medium, None)
            .unwrap();
        db.insert_detection(client_id, flag_id, None, Some("test"), 0.8)
            .unwrap();
    }
}

// ============================================================================
// Weighted average
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_weighted_average_and_approval() {
    let (db, client_id) = db_with_client();
    db.create_criterion("Financial Stability", None, None, 2.0, Some("Assess finances."))
        .unwrap();
    db.create_criterion("Communication", None, None, 1.0, Some("Assess clarity."))
        .unwrap();

    // (90 * 2.0 + 60 * 1.0) / 3.0 = 80
    let score = engine(&db, vec!["90", "60"]).evaluate_client(client_id).await.unwrap();
    assert!((score - 80.0).abs() < 1e-9);

    let client = db.get_client(client_id).unwrap().unwrap();
    assert!((client.overall_score - 80.0).abs() < 1e-9);
    assert_eq!(client.status, ClientStatus::Approved);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_criteria_defaults_to_neutral_pending() {
    let (db, client_id) = db_with_client();

    let score = engine(&db, vec![]).evaluate_client(client_id).await.unwrap();
    assert!((score - 50.0).abs() < 1e-9);
    assert_eq!(
        db.get_client(client_id).unwrap().unwrap().status,
        ClientStatus::Pending
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_criterion_without_prompt_is_skipped() {
    let (db, client_id) = db_with_client();
    db.create_criterion("No prompt", None, None, 5.0, None).unwrap();
    db.create_criterion("Scored", None, None, 1.0, Some("Assess.")).unwrap();

    let score = engine(&db, vec!["72"]).evaluate_client(client_id).await.unwrap();
    assert!((score - 72.0).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unparseable_response_degrades_to_neutral() {
    let (db, client_id) = db_with_client();
    db.create_criterion("A", None, None, 1.0, Some("Assess.")).unwrap();
    db.create_criterion("B", None, None, 1.0, Some("Assess.")).unwrap();

    // First criterion returns garbage -> neutral 50; second returns 100
    let score = engine(&db, vec!["very impressive client", "100"])
        .evaluate_client(client_id)
        .await
        .unwrap();
    assert!((score - 75.0).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_range_scores_are_clamped() {
    let (db, client_id) = db_with_client();
    db.create_criterion("A", None, None, 1.0, Some("Assess.")).unwrap();

    let score = engine(&db, vec!["250"]).evaluate_client(client_id).await.unwrap();
    assert!((score - 100.0).abs() < 1e-9);
}

// ============================================================================
// Red-flag penalty and status mapping
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_penalty_per_detection() {
    let (db, client_id) = db_with_client();
    db.create_criterion("A", None, None, 1.0, Some("Assess.")).unwrap();
    add_detections(&db, client_id, 1);

    // 80 - 1*5 = 75
    let score = engine(&db, vec!["80"]).evaluate_client(client_id).await.unwrap();
    assert!((score - 75.0).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_penalty_is_capped_at_thirty() {
    let (db, client_id) = db_with_client();
    db.create_criterion("A", None, None, 1.0, Some("Assess.")).unwrap();
    add_detections(&db, client_id, 10);

    // 100 - min(50, 30) = 70; the approval threshold is checked before the
    // two-detection rejection rule
    let score = engine(&db, vec!["100"]).evaluate_client(client_id).await.unwrap();
    assert!((score - 70.0).abs() < 1e-9);
    assert_eq!(
        db.get_client(client_id).unwrap().unwrap().status,
        ClientStatus::Approved
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_detections_reject_mid_score() {
    let (db, client_id) = db_with_client();
    db.create_criterion("A", None, None, 1.0, Some("Assess.")).unwrap();
    add_detections(&db, client_id, 2);

    // 65 - 10 = 55: between 50 and 70, but two flags force rejection
    let score = engine(&db, vec!["65"]).evaluate_client(client_id).await.unwrap();
    assert!((score - 55.0).abs() < 1e-9);
    assert_eq!(
        db.get_client(client_id).unwrap().unwrap().status,
        ClientStatus::Rejected
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_low_score_rejects() {
    let (db, client_id) = db_with_client();
    db.create_criterion("A", None, None, 1.0, Some("Assess.")).unwrap();

    let score = engine(&db, vec!["30"]).evaluate_client(client_id).await.unwrap();
    assert!((score - 30.0).abs() < 1e-9);
    assert_eq!(
        db.get_client(client_id).unwrap().unwrap().status,
        ClientStatus::Rejected
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_score_never_goes_below_zero() {
    let (db, client_id) = db_with_client();
    db.create_criterion("A", None, None, 1.0, Some("Assess.")).unwrap();
    add_detections(&db, client_id, 6);

    let score = engine(&db, vec!["10"]).evaluate_client(client_id).await.unwrap();
    assert!(score >= 0.0);
    assert!((score - 0.0).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_client_is_an_error() {
    let db = Database::new_in_memory().unwrap();
    let err = engine(&db, vec![]).evaluate_client(404).await.unwrap_err();
    assert!(matches!(err, AppError::ClientNotFound(404)));
}
