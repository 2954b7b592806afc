//! Service layer

pub mod conversation;
pub mod dossier;
pub mod enrichment;
pub mod red_flags;
pub mod scoring;

pub use conversation::{
    AiInterviewer, InterviewEngine, SendMessageResponse, StartConversationResponse,
};
pub use dossier::DossierExtractor;
pub use enrichment::{EnrichmentJob, EnrichmentQueue};
pub use red_flags::RedFlagDetector;
pub use scoring::ScoringEngine;
