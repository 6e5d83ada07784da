//! # formfill-core
//!
//! Deterministic answer resolution for LLM-assisted form filling.
//!
//! This crate turns a batch of form questions into a prompt, turns the
//! model's free-form reply back into structured answers, and reconciles the
//! two with a fixed fallback policy:
//! - Which questions did the model answer?
//! - Which answers are usable?
//! - What is submitted when the model is silent?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same questions and reply text always give the same results
//! 2. **No I/O**: the model call lives in `formfill-runtime`
//! 3. **Total**: every question gets exactly one result, in input order
//!
//! ## Example
//!
//! ```rust
//! use formfill_core::{build_prompt, normalize_payload, Reconciler};
//!
//! let payload = serde_json::json!({
//!     "questions": [
//!         {"id": "q1", "type": "text", "question": "Capital of Peru?"},
//!         {"id": "q2", "type": "multiple_choice", "options": ["A", "B"]}
//!     ]
//! });
//! let questions = normalize_payload(&payload);
//! let prompt = build_prompt(&questions).unwrap();
//! assert!(prompt.contains("Capital of Peru?"));
//!
//! let results = Reconciler::default()
//!     .reconcile_reply(&questions, r#"[{"id":"q1","answer":"Lima"}]"#);
//! assert!(!results[0].fallback);
//! assert!(results[1].fallback);
//! ```

pub mod answer;
pub mod extract;
pub mod fallback;
pub mod prompt;
pub mod question;
pub mod reconcile;
pub mod result;

// Re-export main types at crate root
pub use answer::{Answer, ModelAnswer};
pub use extract::{extract_answers, ExtractionError};
pub use fallback::{fallback_all, resolve};
pub use prompt::build_prompt;
pub use question::{normalize_payload, Question, QuestionId, QuestionType};
pub use reconcile::{AnswerPolicy, Reconciler};
pub use result::{
    AnswerEnvelope, ModelStatus, ResultRecord, NO_ANSWER_ERROR, NO_CREDENTIAL_ERROR,
    OPTION_MISMATCH_ERROR, PARSE_FAILURE_ERROR,
};

use thiserror::Error;

/// Errors from core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to serialize questions: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_end_to_end_resolution() {
        let payload = json!({
            "questions": [
                {"id": "name", "type": "text", "question": "Your full name"},
                {"id": "capital", "type": "text", "question": "Capital of Japan?"},
                {"id": "colour", "type": "checkbox", "options": ["Red", "Green", "Blue"]}
            ]
        });
        let questions = normalize_payload(&payload);

        let reply = "```json\n[\n  {\"id\": \"name\", \"answer\": \"\"},\n  {\"id\": \"capital\", \"answer\": \"Tokyo\"},\n  {\"id\": \"colour\", \"answer\": [\"Red\", \"Blue\"]}\n]\n```";
        let results = Reconciler::default().reconcile_reply(&questions, reply);

        assert_eq!(results.len(), 3);
        assert!(results[0].fallback);
        assert_eq!(results[0].answer, Some(Answer::from("")));
        assert_eq!(results[1].answer, Some(Answer::from("Tokyo")));
        assert_eq!(
            results[2].answer,
            Some(Answer::Choices(vec!["Red".to_string(), "Blue".to_string()]))
        );

        let envelope = AnswerEnvelope::new(results);
        assert_eq!(envelope.fallback_count(), 1);
    }
}
