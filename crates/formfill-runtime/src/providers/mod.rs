//! LLM Provider abstractions for formfill-runtime.
//!
//! This module defines the trait for LLM providers and the Gemini
//! implementation used to answer form questions.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for secure credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory};

/// Default model for answering questions.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default upper bound on generated tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Default bound on a single model call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Request failed with status code {status}: {message}")]
    ApiError {
        status: u16,
        message: String,
        body: Option<JsonValue>,
    },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// HTTP status of the failed call, when one was received.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body of the failed call, when one was received.
    pub fn response_body(&self) -> Option<&JsonValue> {
        match self {
            ProviderError::ApiError { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role; the prompt is always sent as "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content (empty when the model returned no text)
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model used
    pub model: String,

    /// Finish reason
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// This is the only place where model calls are made. Everything that
/// interprets the reply lives in `formfill-core`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if provider is usable (e.g. has a real credential).
    async fn health_check(&self) -> bool;

    /// Get provider name for logs.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // Simple estimate: ~4 chars per token
        (text.len() / 4) as u32
    }
}
