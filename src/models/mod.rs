//! Domain models

pub mod client;
pub mod conversation;
pub mod criteria;
pub mod dossier;
pub mod question;
pub mod red_flag;
pub mod settings;

pub use client::{Client, ClientStatus};
pub use conversation::{
    AskedQuestion, Conversation, ConversationStatus, Message, MessageRole, QuestionAnswer,
};
pub use criteria::Criterion;
pub use dossier::{DossierCategory, DossierEntry};
pub use question::{NewQuestion, Question};
pub use red_flag::{RedFlag, RedFlagDetection, RedFlagSeverity};
pub use settings::{InterviewMode, VettingSettings, DEFAULT_SYSTEM_PROMPT};
