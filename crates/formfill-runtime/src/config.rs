//! Runtime configuration.
//!
//! Loaded from an optional YAML file, then overridden from the environment:
//!
//! ```yaml
//! provider: gemini
//! model: gemini-2.0-flash
//! base_url: https://generativelanguage.googleapis.com/v1beta
//! timeout: 30s
//! temperature: 0.0
//! max_output_tokens: 4096
//! answer_policy: permissive
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use formfill_core::AnswerPolicy;

use crate::providers::{
    CompletionConfig, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT,
};

/// Env var selecting the provider by registry name.
pub const PROVIDER_ENV: &str = "FORMFILL_PROVIDER";
pub const MODEL_ENV: &str = "FORMFILL_MODEL";
pub const BASE_URL_ENV: &str = "FORMFILL_BASE_URL";
/// Env var for the call timeout, in humantime form (`30s`, `1m 30s`).
pub const TIMEOUT_ENV: &str = "FORMFILL_TIMEOUT";
pub const ANSWER_POLICY_ENV: &str = "FORMFILL_ANSWER_POLICY";
/// Env var holding the model API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default provider name.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default model API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },
}

/// Settings for the answer runtime.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider name looked up in the `ProviderRegistry`
    pub provider: String,

    pub model: String,

    pub base_url: String,

    /// Bound on the single model call
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    pub temperature: f32,

    pub max_output_tokens: u32,

    pub answer_policy: AnswerPolicy,

    /// API key; `GEMINI_API_KEY` is used when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            answer_policy: AnswerPolicy::default(),
            api_key: None,
        }
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("answer_policy", &self.answer_policy)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RuntimeConfig {
    /// Parse configuration from YAML text. Missing fields take defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get(PROVIDER_ENV) {
            self.provider = provider.trim().to_string();
        }
        if let Some(model) = get(MODEL_ENV) {
            self.model = model.trim().to_string();
        }
        if let Some(url) = get(BASE_URL_ENV) {
            self.base_url = url.trim().to_string();
        }
        if let Some(timeout) = get(TIMEOUT_ENV) {
            self.timeout =
                humantime::parse_duration(timeout.trim()).map_err(|e| ConfigError::InvalidEnv {
                    var: TIMEOUT_ENV,
                    reason: e.to_string(),
                })?;
        }
        if let Some(policy) = get(ANSWER_POLICY_ENV) {
            self.answer_policy = policy
                .parse()
                .map_err(|reason| ConfigError::InvalidEnv {
                    var: ANSWER_POLICY_ENV,
                    reason,
                })?;
        }
        // An empty key is kept so the credential check reports it as unusable
        if let Some(key) = lookup(API_KEY_ENV) {
            self.api_key = Some(key);
        }

        Ok(())
    }

    /// Per-call settings handed to the provider.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }

    /// Provider-specific settings for `ProviderRegistry::create`.
    pub fn provider_config(&self) -> JsonValue {
        let mut config = serde_json::json!({
            "model": self.model,
            "base_url": self.base_url,
        });
        if let Some(key) = &self.api_key {
            config["api_key"] = JsonValue::String(key.clone());
        }
        config
    }
}
