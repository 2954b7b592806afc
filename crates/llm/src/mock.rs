//! Mock Provider
//!
//! Deterministic provider used for tests and keyless deployments. Responses
//! can be scripted ahead of time; when the script runs out, a canned
//! interviewer reply is returned.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::{ChatMessage, LlmResult};

/// Reply used when no scripted response is queued
const DEFAULT_REPLY: &str =
    "Thank you for sharing that. Could you tell me a little more about it?";

/// Scriptable mock provider
pub struct MockProvider {
    model: String,
    responses: Mutex<VecDeque<String>>,
}

impl MockProvider {
    /// Create a mock provider with no scripted responses
    pub fn new() -> Self {
        Self {
            model: "mock".to_string(),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Create a mock provider that replies with the given responses in order
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: "mock".to_string(),
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Queue an additional scripted response
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .push_back(response.into());
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _system: Option<String>,
    ) -> LlmResult<String> {
        let next = self
            .responses
            .lock()
            .expect("mock response queue poisoned")
            .pop_front();
        Ok(next.unwrap_or_else(|| DEFAULT_REPLY.to_string()))
    }
}
