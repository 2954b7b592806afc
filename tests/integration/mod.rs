//! Integration Tests Module
//!
//! End-to-end tests for the vetting core: the structured interview flow,
//! the free-form interviewer, dossier extraction, red-flag detection, and
//! client scoring.
//!
//! All tests use in-memory SQLite databases via Database::new_in_memory()
//! and the scriptable mock provider. No network calls are made.

// Structured interview engine tests
mod conversation_test;

// Free-form AI interviewer tests
mod interviewer_test;

// Dossier extraction tests
mod dossier_test;


// Scoring engine tests
mod scoring_test;
