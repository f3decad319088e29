//! Thin `reqwest` clients for the two supported LLM providers.
//!
//! Each is sufficient to exercise the [`crate::LlmClient`] contract
//! against its provider's real completion endpoint; neither attempts to
//! be a full-featured SDK (streaming, tool use, etc. are not needed by
//! the diff-generation loop this crate serves).

use crate::{Completion, LlmClient, LlmError, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Anthropic Messages API client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, "claude-3-5-sonnet-20241022")
    }

    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
    usage: ClaudeUsage,
}

#[derive(Deserialize)]
struct ClaudeContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeUsage {
    input_tokens: u64,
    output_tokens: u64,
}

const MAX_RESPONSE_TOKENS: u32 = 8192;

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError> {
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: MAX_RESPONSE_TOKENS,
            system: system_prompt,
            messages: vec![ClaudeMessage { role: "user", content: user_prompt }],
        };

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("claude returned {status}: {body}")));
        }

        let parsed: ClaudeResponse = response.json().await?;
        let text = parsed.content.into_iter().map(|b| b.text).collect::<Vec<_>>().join("");
        Ok(Completion {
            text,
            usage: Usage {
                prompt_tokens: parsed.usage.input_tokens,
                completion_tokens: parsed.usage.output_tokens,
            },
        })
    }
}

/// OpenAI Chat Completions API client.
pub struct GptClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GptClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, "gpt-4o")
    }

    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

#[derive(Serialize)]
struct GptRequest<'a> {
    model: &'a str,
    messages: Vec<GptMessage<'a>>,
}

#[derive(Serialize)]
struct GptMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct GptResponse {
    choices: Vec<GptChoice>,
    usage: GptUsage,
}

#[derive(Deserialize)]
struct GptChoice {
    message: GptResponseMessage,
}

#[derive(Deserialize)]
struct GptResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct GptUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[async_trait]
impl LlmClient for GptClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError> {
        let request = GptRequest {
            model: &self.model,
            messages: vec![
                GptMessage { role: "system", content: system_prompt },
                GptMessage { role: "user", content: user_prompt },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("gpt returned {status}: {body}")));
        }

        let mut parsed: GptResponse = response.json().await?;
        let choice = parsed.choices.pop().ok_or_else(|| {
            LlmError::MalformedResponse("response had no choices".to_string())
        })?;
        Ok(Completion {
            text: choice.message.content,
            usage: Usage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
            },
        })
    }
}
