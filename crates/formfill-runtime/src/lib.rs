//! # formfill-runtime
//!
//! Model-backed answering for formfill.
//!
//! `formfill-core` decides everything about prompts, replies, and fallbacks
//! without I/O. This crate adds the single model call:
//!
//! - [`providers`]: the [`LlmProvider`] trait, the Gemini provider (feature
//!   `gemini`), and redacted credential handling
//! - [`config`]: [`RuntimeConfig`] from YAML plus environment overrides
//! - [`orchestrator`]: [`AnswerOrchestrator`], which never fails and falls
//!   back deterministically when the model cannot be used
//!
//! ## Example
//!
//! ```rust,ignore
//! use formfill_runtime::{AnswerOrchestrator, ProviderRegistry, RuntimeConfig};
//!
//! let config = RuntimeConfig::load(None)?;
//! let provider = ProviderRegistry::with_defaults()
//!     .create(&config.provider, &config.provider_config())
//!     .ok();
//!
//! let orchestrator = AnswerOrchestrator::new(provider, config);
//! let envelope = orchestrator.answer_payload(&payload).await;
//! ```

pub mod config;
pub mod orchestrator;
pub mod providers;

pub use config::{ConfigError, RuntimeConfig};
pub use orchestrator::{AnswerOrchestrator, AnswerOrchestratorBuilder, AnswerPhase};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, ProviderFactory, ProviderRegistry,
};

#[cfg(feature = "gemini")]
pub use providers::{GeminiProvider, GeminiProviderFactory};
