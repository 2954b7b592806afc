//! Default Catalog Seeding
//!
//! Populates a fresh database with the default settings, question bank,
//! evaluation criteria, and red-flag catalog. Idempotent: an already-seeded
//! database (any settings rows) is left untouched.

use tracing::info;

use crate::models::settings::DEFAULT_SYSTEM_PROMPT;
use crate::models::{NewQuestion, RedFlagSeverity};
use crate::storage::Database;
use crate::utils::error::AppResult;

/// Seed default data into an empty database.
///
/// Returns `true` when seeding ran, `false` when the database already had
/// settings and was skipped.
pub fn seed_defaults(db: &Database) -> AppResult<bool> {
    if db.settings_count()? > 0 {
        return Ok(false);
    }

    seed_settings(db)?;
    seed_questions(db)?;
    seed_criteria(db)?;
    seed_red_flags(db)?;

    info!("Seeded default settings, questions, criteria, and red flags");
    Ok(true)
}

fn seed_settings(db: &Database) -> AppResult<()> {
    db.set_setting(
        "ai_api_provider",
        "mock",
        Some("AI provider: openai, anthropic, gemini, ollama (local), mock (no API key)"),
    )?;
    db.set_setting(
        "ai_model",
        "gemini-1.5-flash",
        Some("AI model to use for conversations"),
    )?;
    db.set_setting(
        "ai_temperature",
        "0.7",
        Some("Temperature for AI responses (0-1)"),
    )?;
    db.set_setting("ai_max_tokens", "500", Some("Max tokens per AI response"))?;
    db.set_setting(
        "system_prompt",
        DEFAULT_SYSTEM_PROMPT,
        Some("Base system prompt for AI"),
    )?;
    db.set_setting(
        "min_messages_threshold",
        "20",
        Some("Minimum messages before evaluation"),
    )?;
    db.set_setting(
        "auto_evaluate",
        "true",
        Some("Automatically evaluate client after conversation ends"),
    )?;
    db.set_setting(
        "interview_mode",
        "structured",
        Some("Interview engine: structured or free_form"),
    )?;
    Ok(())
}

fn seed_questions(db: &Database) -> AppResult<()> {
    let questions = [
        NewQuestion::new(
            "Can you tell me about your current business or professional situation?",
            "business_life",
            10,
        )
        .required(),
        NewQuestion::new(
            "What are your main goals for seeking our services?",
            "goals",
            10,
        )
        .required(),
        NewQuestion::new("Tell me about your family and personal life.", "personal_life", 8)
            .required(),
        NewQuestion::new(
            "What was your childhood like? Where did you grow up?",
            "childhood",
            7,
        ),
        NewQuestion::new("What is your educational background?", "education", 7).required(),
        NewQuestion::new("What are your core values?", "values", 9).required(),
        NewQuestion::new("Can you describe your financial situation?", "financial", 8).required(),
        NewQuestion::new("Have you worked with similar services before?", "background", 6),
        NewQuestion::new(
            "What challenges are you currently facing?",
            "business_life",
            8,
        )
        .required(),
        NewQuestion::new(
            "Who are the most important people in your life?",
            "family",
            7,
        ),
    ];

    for question in &questions {
        db.create_question(question)?;
    }
    Ok(())
}

fn seed_criteria(db: &Database) -> AppResult<()> {
    let criteria: [(&str, &str, &str, f64, &str); 5] = [
        (
            "Financial Stability",
            "Assess the client's financial situation and stability",
            "financial",
            1.5,
            "Evaluate the client's financial stability based on their statements about income, assets, debts, and financial planning.",
        ),
        (
            "Professional Background",
            "Evaluate professional experience and current business status",
            "business",
            1.2,
            "Assess the client's professional background, experience, and current business or employment situation.",
        ),
        (
            "Communication Skills",
            "Assess clarity and professionalism in communication",
            "personal",
            1.0,
            "Evaluate how clearly and professionally the client communicates.",
        ),
        (
            "Alignment with Values",
            "Check if client's values align with company values",
            "values",
            1.3,
            "Determine if the client's stated values and principles align with the company's core values.",
        ),
        (
            "Realistic Expectations",
            "Evaluate if client has realistic expectations",
            "goals",
            1.1,
            "Assess whether the client has realistic expectations about outcomes and timelines.",
        ),
    ];

    for (name, description, category, weight, prompt) in criteria {
        db.create_criterion(name, Some(description), Some(category), weight, Some(prompt))?;
    }
    Ok(())
}

fn seed_red_flags(db: &Database) -> AppResult<()> {
    let flags: [(&str, &str, RedFlagSeverity, &str); 6] = [
        (
            "Inconsistent Information",
            "Client provides contradictory information",
            RedFlagSeverity::High,
            "inconsistent,contradiction,changed story",
        ),
        (
            "Financial Distress",
            "Signs of severe financial problems",
            RedFlagSeverity::Critical,
            "bankruptcy,debt,foreclosure,repossession",
        ),
        (
            "Unrealistic Expectations",
            "Extremely unrealistic goals or expectations",
            RedFlagSeverity::Medium,
            "overnight success,guaranteed,get rich quick",
        ),
        (
            "Poor Communication",
            "Inability to communicate clearly or professionally",
            RedFlagSeverity::Medium,
            "rude,disrespectful,unclear",
        ),
        (
            "Legal Issues",
            "Mentions of ongoing legal problems",
            RedFlagSeverity::High,
            "lawsuit,criminal,investigation,indicted",
        ),
        (
            "Lack of Commitment",
            "Shows minimal commitment or seriousness",
            RedFlagSeverity::Low,
            "maybe,not sure,just browsing",
        ),
    ];

    for (name, description, severity, keywords) in flags {
        db.create_red_flag(name, Some(description), severity, Some(keywords))?;
    }
    Ok(())
}
