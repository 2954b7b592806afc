//! Client Vetting - Core Library
//!
//! Backend core for a client-vetting application. It includes:
//! - The interview conversation engines (structured and free-form)
//! - Dossier extraction from finished interviews
//! - Red-flag detection over conversation transcripts
//! - Weighted-criteria client scoring
//! - Storage layer (SQLite) and data models

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::{
    Client, ClientStatus, Conversation, ConversationStatus, Criterion, DossierCategory,
    DossierEntry, InterviewMode, Message, MessageRole, NewQuestion, Question, QuestionAnswer,
    RedFlag, RedFlagDetection, RedFlagSeverity, VettingSettings,
};
pub use services::{
    AiInterviewer, DossierExtractor, EnrichmentJob, EnrichmentQueue, InterviewEngine,
    RedFlagDetector, ScoringEngine, SendMessageResponse, StartConversationResponse,
};
pub use storage::{seed_defaults, Database};
pub use utils::error::{AppError, AppResult};
