//! API key handling.
//!
//! The key is held in a [`SecretString`]: it never shows up in `Debug` or
//! `Display` output, is zeroed on drop, and is read only through
//! [`ApiCredential::expose`] where the request is built.
//!
//! Sample `.env` files ship with `GEMINI_API_KEY=YOUR_API_KEY_HERE`. That
//! value, like an empty or blank key, counts as no key at all.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Key value shipped in sample `.env` files.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Where a credential came from, shown in redacted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialSource::Config => "config",
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "programmatic",
        })
    }
}

/// A provider API key.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Key from `config[config_key]`, else from `env_var`.
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = config[config_key].as_str() {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        std::env::var(env_var)
            .map(|value| Self::new(value, CredentialSource::Environment, name))
            .map_err(|_| {
                ProviderError::NotConfigured(format!(
                    "{} required: set '{}' in config or {} environment variable",
                    name, config_key, env_var
                ))
            })
    }

    /// Whether either source has a key, without reading it into a credential.
    pub fn is_available(config: &JsonValue, config_key: &str, env_var: &str) -> bool {
        config[config_key].is_string() || std::env::var_os(env_var).is_some()
    }

    /// The raw key. Call only where the request is built.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Empty or whitespace-only key.
    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        self.expose().trim() == PLACEHOLDER_API_KEY
    }

    /// Whether the key is worth sending.
    pub fn is_usable(&self) -> bool {
        !self.is_empty() && !self.is_placeholder()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "AIza-super-secret-key-12345";

    #[test]
    fn test_redacted_output() {
        let cred = ApiCredential::new(SECRET, CredentialSource::Config, "Gemini API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(SECRET), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));

        let display = cred.to_string();
        assert!(!display.contains(SECRET), "Secret exposed in Display!");
        assert_eq!(display, "Gemini API key from config [REDACTED]");

        assert_eq!(cred.expose(), SECRET);
    }

    #[test]
    fn test_placeholder_and_blank_are_unusable() {
        let placeholder =
            ApiCredential::new(PLACEHOLDER_API_KEY, CredentialSource::Environment, "Test");
        assert!(placeholder.is_placeholder());
        assert!(!placeholder.is_usable());

        let padded = ApiCredential::new(" YOUR_API_KEY_HERE\n", CredentialSource::Environment, "Test");
        assert!(!padded.is_usable());

        let blank = ApiCredential::new("  ", CredentialSource::Environment, "Test");
        assert!(blank.is_empty());
        assert!(!blank.is_usable());

        assert!(ApiCredential::new("real-key", CredentialSource::Environment, "Test").is_usable());
    }

    #[test]
    fn test_config_wins_over_env() {
        std::env::set_var("FORMFILL_TEST_KEY_PRIORITY", "env-key");
        let cred = ApiCredential::from_config_or_env(
            &json!({"api_key": "config-key"}),
            "api_key",
            "FORMFILL_TEST_KEY_PRIORITY",
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert!(cred.to_string().contains("from config"));
        std::env::remove_var("FORMFILL_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_env_fallback() {
        std::env::set_var("FORMFILL_TEST_KEY_FALLBACK", "env-key");
        let cred = ApiCredential::from_config_or_env(
            &json!({}),
            "api_key",
            "FORMFILL_TEST_KEY_FALLBACK",
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "env-key");
        assert!(cred.to_string().contains("from environment"));
        std::env::remove_var("FORMFILL_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_missing_everywhere() {
        let err = ApiCredential::from_config_or_env(
            &json!({}),
            "api_key",
            "FORMFILL_NONEXISTENT_VAR_12345",
            "Test key",
        )
        .unwrap_err();

        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("FORMFILL_NONEXISTENT_VAR_12345"));

        assert!(!ApiCredential::is_available(&json!({}), "api_key", "FORMFILL_NONEXISTENT_VAR_12345"));
        assert!(ApiCredential::is_available(
            &json!({"api_key": ""}),
            "api_key",
            "FORMFILL_NONEXISTENT_VAR_12345"
        ));
    }
}
