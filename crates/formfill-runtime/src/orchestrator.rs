//! Answer orchestrator.
//!
//! Runs one batch of questions through the model with deterministic fallback:
//!
//! ```text
//! Empty ─────────────────────────────────────► no results
//! NoCredential ──────────────────────────────► fallback (all)
//! Calling ──► TransportError ────────────────► fallback (all, with status/data)
//!        └──► Extracted ──► Reconciler ──────► per-question model answer or fallback
//! ```
//!
//! Every path ends in an [`AnswerEnvelope`]; no error reaches the caller.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use formfill_core::{
    build_prompt, fallback_all, normalize_payload, AnswerEnvelope, ModelStatus, Question,
    Reconciler, ResultRecord, NO_CREDENTIAL_ERROR,
};

use crate::config::RuntimeConfig;
use crate::providers::{ChatMessage, LlmProvider, ProviderError};

/// Where a batch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerPhase {
    /// No questions; nothing to do
    Empty,
    /// No usable provider; model never called
    NoCredential,
    /// Model request in flight
    Calling,
    /// Request failed or could not be built
    TransportError,
    /// Reply text received and handed to the reconciler
    Extracted,
}

impl fmt::Display for AnswerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnswerPhase::Empty => "empty",
            AnswerPhase::NoCredential => "no_credential",
            AnswerPhase::Calling => "calling",
            AnswerPhase::TransportError => "transport_error",
            AnswerPhase::Extracted => "extracted",
        };
        f.write_str(name)
    }
}

/// Answers form questions with an optional model provider.
///
/// Shared across requests through `Arc`; holds no per-call state.
pub struct AnswerOrchestrator {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
    reconciler: Reconciler,
}

impl fmt::Debug for AnswerOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerOrchestrator")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("config", &self.config)
            .field("reconciler", &self.reconciler)
            .finish()
    }
}

impl AnswerOrchestrator {
    /// Create an orchestrator. `None` means every batch falls back.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, config: RuntimeConfig) -> Self {
        let reconciler = Reconciler::new(config.answer_policy);
        Self {
            provider,
            config,
            reconciler,
        }
    }

    pub fn builder() -> AnswerOrchestratorBuilder {
        AnswerOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Normalize a raw request payload and answer it.
    pub async fn answer_payload(&self, payload: &JsonValue) -> AnswerEnvelope {
        self.answer(normalize_payload(payload)).await
    }

    /// Answer a batch of questions.
    pub async fn answer(&self, questions: Vec<Question>) -> AnswerEnvelope {
        let (phase, results) = self.resolve(&questions).await;
        let envelope = AnswerEnvelope::new(results);

        info!(
            phase = %phase,
            questions = questions.len(),
            fallbacks = envelope.fallback_count(),
            "Answered questions"
        );
        envelope
    }

    async fn resolve(&self, questions: &[Question]) -> (AnswerPhase, Vec<ResultRecord>) {
        if questions.is_empty() {
            debug!("Empty question batch, skipping model call");
            return (AnswerPhase::Empty, Vec::new());
        }

        let provider = match &self.provider {
            Some(provider) if provider.health_check().await => provider,
            _ => {
                warn!(questions = questions.len(), "No usable credential, using fallback answers");
                let status = ModelStatus::failed(NO_CREDENTIAL_ERROR);
                return (AnswerPhase::NoCredential, fallback_all(questions, &status));
            }
        };

        let prompt = match build_prompt(questions) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Could not build prompt, using fallback answers");
                let status = ModelStatus::failed(e.to_string());
                return (AnswerPhase::TransportError, fallback_all(questions, &status));
            }
        };

        debug!(
            phase = %AnswerPhase::Calling,
            provider = provider.name(),
            estimated_tokens = provider.estimate_tokens(&prompt),
            "Calling model"
        );

        match self.call(provider.as_ref(), prompt).await {
            Ok(reply) => {
                debug!(phase = %AnswerPhase::Extracted, reply_len = reply.len(), "Reconciling reply");
                (
                    AnswerPhase::Extracted,
                    self.reconciler.reconcile_reply(questions, &reply),
                )
            }
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    error = %e,
                    status = ?e.http_status(),
                    "Model call failed, using fallback answers"
                );
                let status = ModelStatus::failed(e.to_string())
                    .with_http(e.http_status(), e.response_body().cloned());
                (AnswerPhase::TransportError, fallback_all(questions, &status))
            }
        }
    }

    /// One bounded provider call.
    async fn call(&self, provider: &dyn LlmProvider, prompt: String) -> Result<String, ProviderError> {
        let completion = self.config.completion_config();
        let timeout = completion.timeout;

        match tokio::time::timeout(
            timeout,
            provider.complete(vec![ChatMessage::user(prompt)], &completion),
        )
        .await
        {
            Ok(result) => result.map(|response| {
                debug!(
                    model = %response.model,
                    stop_reason = ?response.stop_reason,
                    prompt_tokens = response.usage.prompt_tokens,
                    total_tokens = response.usage.total(),
                    "Model replied"
                );
                response.content
            }),
            Err(_) => Err(ProviderError::Timeout(timeout)),
        }
    }
}

/// Builder for [`AnswerOrchestrator`].
#[derive(Default)]
pub struct AnswerOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
}

impl AnswerOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> AnswerOrchestrator {
        AnswerOrchestrator::new(self.provider, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionConfig, CompletionResponse, TokenUsage};
    use async_trait::async_trait;
    use formfill_core::{
        Answer, AnswerPolicy, QuestionType, NO_ANSWER_ERROR, OPTION_MISMATCH_ERROR,
        PARSE_FAILURE_ERROR,
    };
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Text(&'static str),
        Fail(fn() -> ProviderError),
        Hang,
    }

    struct MockProvider {
        reply: Reply,
        usable: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl MockProvider {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                usable: true,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn unusable(mut self) -> Self {
            self.usable = false;
            self
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .extend(messages.into_iter().map(|m| m.content));

            match &self.reply {
                Reply::Text(text) => Ok(CompletionResponse {
                    content: text.to_string(),
                    usage: TokenUsage::default(),
                    model: config.model.clone(),
                    stop_reason: Some("STOP".to_string()),
                }),
                Reply::Fail(make) => Err(make()),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ProviderError::HttpError("unreachable".to_string()))
                }
            }
        }

        async fn health_check(&self) -> bool {
            self.usable
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::new("q1", QuestionType::Text).with_field("question", "Capital of France?"),
            Question::new("q2", QuestionType::MultipleChoice).with_options(["A", "B"]),
        ]
    }

    fn orchestrator(provider: Arc<MockProvider>) -> AnswerOrchestrator {
        AnswerOrchestrator::builder().provider(provider).build()
    }

    #[tokio::test]
    async fn test_no_provider_falls_back() {
        let orchestrator = AnswerOrchestrator::builder().build();
        let envelope = orchestrator
            .answer(vec![
                Question::new("q1", QuestionType::Dropdown).with_options(["X", "Y"]),
            ])
            .await;

        assert!(envelope.received);
        let record = &envelope.results[0];
        assert_eq!(record.answer, Some(Answer::from("X")));
        assert!(record.fallback);
        assert_eq!(record.model_status.error.as_deref(), Some(NO_CREDENTIAL_ERROR));
    }

    #[tokio::test]
    async fn test_placeholder_credential_never_calls_model() {
        let provider = Arc::new(MockProvider::new(Reply::Text("[]")).unusable());
        let envelope = orchestrator(provider.clone()).answer(questions()).await;

        assert_eq!(provider.calls(), 0);
        assert_eq!(envelope.fallback_count(), 2);
        assert_eq!(envelope.results[0].answer, Some(Answer::from("")));
        assert_eq!(
            envelope.results[1].model_status.error.as_deref(),
            Some(NO_CREDENTIAL_ERROR)
        );
    }

    #[tokio::test]
    async fn test_missing_id_falls_back_for_that_question() {
        let provider = Arc::new(MockProvider::new(Reply::Text(
            "```json\n[{\"id\":\"q1\",\"answer\":\"Paris\"}]\n```",
        )));
        let envelope = orchestrator(provider.clone()).answer(questions()).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(envelope.results[0].answer, Some(Answer::from("Paris")));
        assert!(!envelope.results[0].fallback);
        assert_eq!(envelope.results[1].answer, Some(Answer::from("A")));
        assert_eq!(
            envelope.results[1].model_status.error.as_deref(),
            Some(NO_ANSWER_ERROR)
        );
    }

    #[tokio::test]
    async fn test_prompt_carries_questions() {
        let provider = Arc::new(MockProvider::new(Reply::Text("[]")));
        orchestrator(provider.clone()).answer(questions()).await;

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Capital of France?"));
    }

    #[tokio::test]
    async fn test_unparseable_reply() {
        let provider = Arc::new(MockProvider::new(Reply::Text("not json at all")));
        let envelope = orchestrator(provider).answer(questions()).await;

        assert_eq!(envelope.fallback_count(), 2);
        for record in &envelope.results {
            assert_eq!(record.model_status.error.as_deref(), Some(PARSE_FAILURE_ERROR));
        }
    }

    #[tokio::test]
    async fn test_transport_error_echoes_status_and_body() {
        let provider = Arc::new(MockProvider::new(Reply::Fail(|| ProviderError::ApiError {
            status: 403,
            message: "API key not valid".to_string(),
            body: Some(json!({"error": {"code": 403, "status": "PERMISSION_DENIED"}})),
        })));
        let envelope = orchestrator(provider).answer(questions()).await;

        assert_eq!(envelope.fallback_count(), 2);
        let status = &envelope.results[1].model_status;
        assert!(!status.ok);
        assert_eq!(status.status, Some(403));
        assert_eq!(status.data.as_ref().unwrap()["error"]["status"], "PERMISSION_DENIED");
        assert!(status.error.as_deref().unwrap().contains("403"));
        assert_eq!(envelope.results[1].answer, Some(Answer::from("A")));
    }

    #[tokio::test]
    async fn test_network_error_has_no_status() {
        let provider = Arc::new(MockProvider::new(Reply::Fail(|| {
            ProviderError::HttpError("connection refused".to_string())
        })));
        let envelope = orchestrator(provider).answer(questions()).await;

        let status = &envelope.results[0].model_status;
        assert!(status.error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(status.status, None);
        assert!(status.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_transport_error() {
        let provider = Arc::new(MockProvider::new(Reply::Hang));
        let config = RuntimeConfig {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let envelope = AnswerOrchestrator::builder()
            .provider(provider)
            .config(config)
            .build()
            .answer(questions())
            .await;

        assert_eq!(envelope.fallback_count(), 2);
        assert!(envelope.results[0]
            .model_status
            .error
            .as_deref()
            .unwrap()
            .starts_with("Timeout"));
    }

    #[tokio::test]
    async fn test_strict_policy_from_config() {
        let provider = Arc::new(MockProvider::new(Reply::Text(
            r#"[{"id":"q1","answer":"Paris"},{"id":"q2","answer":"C"}]"#,
        )));
        let config = RuntimeConfig {
            answer_policy: AnswerPolicy::Strict,
            ..Default::default()
        };
        let envelope = AnswerOrchestrator::builder()
            .provider(provider)
            .config(config)
            .build()
            .answer(questions())
            .await;

        assert!(!envelope.results[0].fallback);
        assert!(envelope.results[1].fallback);
        assert_eq!(
            envelope.results[1].model_status.error.as_deref(),
            Some(OPTION_MISMATCH_ERROR)
        );
    }

    #[tokio::test]
    async fn test_answer_payload_single_question_and_empty() {
        let provider = Arc::new(MockProvider::new(Reply::Text(r#"[{"id":7,"answer":"B"}]"#)));
        let orchestrator = orchestrator(provider.clone());

        let envelope = orchestrator
            .answer_payload(&json!({"id": 7, "type": "dropdown", "question": "Pick", "options": ["A", "B"]}))
            .await;
        assert_eq!(envelope.results.len(), 1);
        assert_eq!(envelope.results[0].answer, Some(Answer::from("B")));

        let empty = orchestrator.answer_payload(&json!("nonsense")).await;
        assert!(empty.received);
        assert!(empty.results.is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_has_its_own_phase() {
        let provider = Arc::new(MockProvider::new(Reply::Text("[]")));
        let orchestrator = orchestrator(provider.clone());

        let (phase, results) = orchestrator.resolve(&[]).await;
        assert_eq!(phase, AnswerPhase::Empty);
        assert!(results.is_empty());
        assert_eq!(provider.calls(), 0);

        let (phase, _) = orchestrator.resolve(&questions()).await;
        assert_eq!(phase, AnswerPhase::Extracted);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(AnswerPhase::Empty.to_string(), "empty");
        assert_eq!(AnswerPhase::NoCredential.to_string(), "no_credential");
        assert_eq!(AnswerPhase::TransportError.to_string(), "transport_error");
    }
}
