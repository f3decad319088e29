// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-llm: a variant-tagged adapter over the supported LLM providers.
//!
//! The provider HTTP clients themselves are an external collaborator —
//! this crate ships the [`LlmClient`] trait, a thin `reqwest`-based
//! implementation per provider sufficient to exercise the contract, and
//! a [`FakeLlmClient`] for tests.

mod fake;
mod provider;

pub use fake::FakeLlmClient;
pub use provider::{ClaudeClient, GptClient};

use async_trait::async_trait;
use pf_core::LlmModel;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a single LLM completion call
/// ("LLM 25-30s" suspension point).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token usage reported alongside a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A completed LLM call: the raw text plus its token usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm request timed out after {0:?}")]
    Timeout(Duration),
    #[error("llm provider returned an error response: {0}")]
    Provider(String),
    #[error("llm response was missing expected fields: {0}")]
    MalformedResponse(String),
}

/// One call to an LLM provider: a system/user prompt pair in, a
/// [`Completion`] out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError>;
}

/// Dispatches to the configured provider client by [`LlmModel`].
///
/// Holds one boxed client per supported variant; `route` never performs
/// provider selection logic beyond matching on `model` — all provider
/// specifics live behind [`LlmClient`].
pub struct LlmRouter {
    claude: Box<dyn LlmClient>,
    gpt: Box<dyn LlmClient>,
}

impl LlmRouter {
    pub fn new(claude: Box<dyn LlmClient>, gpt: Box<dyn LlmClient>) -> Self {
        Self { claude, gpt }
    }

    pub async fn complete(
        &self,
        model: LlmModel,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Completion, LlmError> {
        let client = match model {
            LlmModel::Claude => self.claude.as_ref(),
            LlmModel::Gpt => self.gpt.as_ref(),
        };
        match tokio::time::timeout(REQUEST_TIMEOUT, client.complete(system_prompt, user_prompt)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(REQUEST_TIMEOUT)),
        }
    }
}
