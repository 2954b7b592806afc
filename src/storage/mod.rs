//! Storage layer

pub mod database;
pub mod seed;

pub use database::{Database, DbPool};
pub use seed::seed_defaults;
