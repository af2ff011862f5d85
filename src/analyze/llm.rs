//! Chat-completion client for the language-model endpoint
//!
//! Speaks the OpenAI-compatible `/chat/completions` wire format. The
//! `ChatBackend` trait is the seam the analyzer depends on, so tests can
//! script responses without a network.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::retry::{with_retry, Retryable, RetryPolicy};

/// Default completion endpoint
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model when the caller does not choose one
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Per-call transport timeout
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Errors that can occur when calling the language model
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was configured or found in the environment
    #[error("API key must be provided or set in {API_KEY_ENV}")]
    MissingApiKey,

    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint reported throttling
    #[error("rate limit exceeded")]
    RateLimited,

    /// The endpoint rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The endpoint answered with an unexpected status
    #[error("API returned status {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// The response body did not carry a completion
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited => true,
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Api { status, .. } => status.is_server_error(),
            LlmError::MissingApiKey | LlmError::Auth(_) | LlmError::InvalidResponse(_) => false,
        }
    }
}

/// Role attached to a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A role-tagged message sent to the completion endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// Builds a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Builds a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// The narrow seam to the language-model collaborator
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Requests one completion for the given conversation
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

/// One choice in a completion response
#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Completion response body
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

/// Client for an OpenAI-compatible chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    /// HTTP client for making requests
    http: Client,
    /// Bearer token for the endpoint
    api_key: String,
    /// Model requested for every completion
    model: String,
    /// Retry policy for transport failures
    retry: RetryPolicy,
    /// Base URL for the endpoint (allows override for self-hosted gateways)
    base_url: String,
}

impl ChatClient {
    /// Creates a new client.
    ///
    /// # Arguments
    /// * `model` - Model identifier requested for every completion
    /// * `api_key` - Bearer token; falls back to the `OPENAI_API_KEY`
    ///   environment variable when `None`
    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Result<Self, LlmError> {
        let api_key = match api_key {
            Some(key) => key,
            None => std::env::var(API_KEY_ENV).map_err(|_| LlmError::MissingApiKey)?,
        };

        Ok(Self {
            http: Client::new(),
            api_key,
            model: model.into(),
            retry: RetryPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the endpoint base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Requests a completion once, without retry
    async fn complete_once(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages
                .iter()
                .map(|m| serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                }))
                .collect::<Vec<_>>(),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        debug!(model = %self.model, messages = messages.len(), "completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => LlmError::RateLimited,
                401 => LlmError::Auth(message),
                _ => LlmError::Api { status, message },
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        with_retry(&self.retry, "chat_completion", || {
            self.complete_once(messages, temperature, max_tokens)
        })
        .await
    }
}
