//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with a request
//! timeout applied, so a hung capability call degrades into an error instead
//! of blocking the enrichment pipeline indefinitely.

use std::time::Duration;

/// Build a `reqwest::Client` with the given request timeout in seconds.
pub fn build_http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build reqwest client")
}
