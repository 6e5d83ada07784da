//! Per-question results and the response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answer::{Answer, ModelAnswer};
use crate::question::{Question, QuestionId, QuestionType};

/// No credential was configured, so the model was never called.
pub const NO_CREDENTIAL_ERROR: &str = "No GEMINI_KEY - fallback used";

/// The model reply could not be turned into an answer array.
pub const PARSE_FAILURE_ERROR: &str = "Failed to parse Gemini response";

/// The model reply had no usable entry for this question.
pub const NO_ANSWER_ERROR: &str = "No answer from Gemini for this question";

/// The model answer was not one of the question's options (strict policy).
pub const OPTION_MISMATCH_ERROR: &str = "Answer not among question options";

/// How the model fared for one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    /// Whether the model supplied the answer
    pub ok: bool,

    /// Why the model answer was not used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// HTTP status of a failed model call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Response body of a failed model call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// The model entry that was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ModelAnswer>,
}

impl ModelStatus {
    /// Status for an answer taken from the model.
    pub fn answered(parsed: ModelAnswer) -> Self {
        Self {
            ok: true,
            parsed: Some(parsed),
            ..Default::default()
        }
    }

    /// Status for a question that fell back.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Attach HTTP diagnostics from a failed call.
    pub fn with_http(mut self, status: Option<u16>, data: Option<Value>) -> Self {
        self.status = status;
        self.data = data;
        self
    }
}

/// The final answer record for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Identifier of the question
    pub question_id: Option<QuestionId>,

    /// Type of the question
    pub question_type: Option<QuestionType>,

    /// Model outcome for this question
    pub model_status: ModelStatus,

    /// The answer to submit
    pub answer: Option<Answer>,

    /// True when `answer` did not come from the model
    pub fallback: bool,
}

impl ResultRecord {
    /// Record an answer taken verbatim from the model.
    pub fn from_model(question: &Question, answer: Answer, parsed: ModelAnswer) -> Self {
        Self {
            question_id: question.id.clone(),
            question_type: question.kind.clone(),
            model_status: ModelStatus::answered(parsed),
            answer: Some(answer),
            fallback: false,
        }
    }

    /// Record a fallback answer.
    pub fn from_fallback(question: &Question, status: ModelStatus) -> Self {
        Self {
            question_id: question.id.clone(),
            question_type: question.kind.clone(),
            model_status: status,
            answer: crate::fallback::resolve(question),
            fallback: true,
        }
    }
}

/// Response body returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEnvelope {
    /// Always true
    pub received: bool,

    /// One record per question, in input order
    pub results: Vec<ResultRecord>,
}

impl AnswerEnvelope {
    /// Wrap a result list.
    pub fn new(results: Vec<ResultRecord>) -> Self {
        Self {
            received: true,
            results,
        }
    }

    /// Number of results that used the fallback.
    pub fn fallback_count(&self) -> usize {
        self.results.iter().filter(|r| r.fallback).count()
    }
}
