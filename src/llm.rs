//! Chat-completion model abstraction.
//!
//! Every model call returns a [`Completion`] with the answer text already
//! extracted, so callers never probe response shapes. [`OpenAiChatModel`]
//! talks to any OpenAI-compatible `POST /chat/completions` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ModelConfig;

/// Normalized result of a chat-model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no content")]
    EmptyResponse,
    #[error("model client not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    /// Every upstream failure is worth another attempt; a client that was
    /// never configured is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::NotConfigured(_))
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send a single user prompt and return the model's reply.
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError>;
}

// ============ OpenAI-compatible client ============

pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(config: &ModelConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
            temperature: config.temperature,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::NotConfigured("API key not set".to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parse_chat_response(parsed)
    }
}

fn parse_chat_response(response: ChatResponse) -> Result<Completion, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(Completion::new)
        .ok_or(LlmError::EmptyResponse)
}
