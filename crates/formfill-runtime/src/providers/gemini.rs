//! Google Gemini provider implementation.
//!
//! Calls the `generateContent` endpoint with the credential in the query
//! string and reads the reply from `candidates[0].content.parts[0].text`.
//! A successful response whose body lacks that path, or is not JSON at all,
//! yields empty reply text rather than an error.
//!
//! ## Security
//!
//! This provider uses the centralized [`ApiCredential`] system for secure
//! credential handling. See the [`secrets`](super::secrets) module for details.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::new(
            api_key,
            CredentialSource::Programmatic,
            "Gemini API key",
        ))
    }

    /// Create from JSON configuration with environment fallback.
    ///
    /// `api_key` in the config wins over `GEMINI_API_KEY`; neither set is an
    /// error.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            GEMINI_API_KEY_ENV,
            "Gemini API key",
        )?;

        let provider = Self::with_credential(credential);
        Ok(match config["base_url"].as_str() {
            Some(url) => provider.with_base_url(url),
            None => provider,
        })
    }

    fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: GEMINI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

/// Gemini API request format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> GenerateContentRequest {
    let contents = messages
        .into_iter()
        .map(|msg| Content {
            role: msg.role,
            parts: vec![Part { text: msg.content }],
        })
        .collect();

    GenerateContentRequest {
        contents,
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        },
    }
}

/// Decode a 2xx body. Anything that is not JSON reads as `null`.
fn decode_body(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::debug!(error = %e, bytes = raw.len(), "Gemini response body is not JSON");
        JsonValue::Null
    })
}

/// Text of the first part of the first candidate, or empty.
fn reply_text(body: &JsonValue) -> String {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn token_usage(body: &JsonValue) -> TokenUsage {
    let count = |path: &str| {
        body.pointer(path)
            .and_then(JsonValue::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };

    TokenUsage {
        prompt_tokens: count("/usageMetadata/promptTokenCount"),
        completion_tokens: count("/usageMetadata/candidatesTokenCount"),
    }
}

/// Turn a non-2xx body into an error carrying the status and body.
fn api_error(status: u16, raw: &str) -> ProviderError {
    let body = serde_json::from_str::<JsonValue>(raw).ok();
    let message = body
        .as_ref()
        .and_then(|b| b["error"]["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string());

    ProviderError::ApiError {
        status,
        message,
        body: body.or_else(|| (!raw.is_empty()).then(|| JsonValue::String(raw.to_string()))),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = build_request(messages, config);

        // reqwest errors carry the URL, which carries the key
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                ProviderError::Timeout(config.timeout)
            } else {
                ProviderError::HttpError(e.without_url().to_string())
            }
        };

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(self.endpoint(&config.model))
            .query(&[("key", self.credential.expose())])
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let raw = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &raw));
        }

        let body = decode_body(&raw);

        Ok(CompletionResponse {
            content: reply_text(&body),
            usage: token_usage(&body),
            model: body["modelVersion"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| config.model.clone()),
            stop_reason: body
                .pointer("/candidates/0/finishReason")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
        })
    }

    async fn health_check(&self) -> bool {
        // Verify the key is set and not the sample placeholder (without logging the value)
        self.credential.is_usable()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Factory for creating Gemini providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "AIza...",                 // Optional, falls back to GEMINI_API_KEY env
///   "base_url": "https://..."             // Optional, custom API endpoint
/// }
/// ```
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = GeminiProvider::from_config(config)?;
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", GEMINI_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Gemini API key required: set 'api_key' in config or {} env",
                GEMINI_API_KEY_ENV
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }
}
