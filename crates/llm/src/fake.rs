//! Test double for [`crate::LlmClient`] — no network access, deterministic.

use crate::{Completion, LlmClient, LlmError, Usage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Returns scripted completions in order, or repeats the last one once
/// the script is exhausted. Records every prompt it was called with, so
/// engine tests can assert feedback was threaded into the next call.
pub struct FakeLlmClient {
    script: Mutex<VecDeque<Result<Completion, String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeLlmClient {
    pub fn responding_with(text: impl Into<String>, usage: Usage) -> Self {
        Self::scripted(vec![Ok(Completion { text: text.into(), usage })])
    }

    pub fn scripted(script: Vec<Result<Completion, String>>) -> Self {
        Self { script: Mutex::new(script.into()), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError> {
        self.calls.lock().push((system_prompt.to_string(), user_prompt.to_string()));
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(message)) => Err(LlmError::Provider(message)),
            None => Err(LlmError::Provider("fake llm client script exhausted".to_string())),
        }
    }
}
