//! Reconciliation of extracted answers with the original questions.
//!
//! Produces exactly one [`ResultRecord`] per question, in input order.
//! Matching is exact equality on `id`; questions without an id never match.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::answer::ModelAnswer;
use crate::extract::{extract_answers, ExtractionError};
use crate::fallback::fallback_all;
use crate::question::Question;
use crate::result::{
    ModelStatus, ResultRecord, NO_ANSWER_ERROR, OPTION_MISMATCH_ERROR, PARSE_FAILURE_ERROR,
};

/// Which model answers are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPolicy {
    /// Any usable answer is taken verbatim
    #[default]
    Permissive,

    /// Answers to questions with options must be drawn from those options
    Strict,
}

impl std::str::FromStr for AnswerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(AnswerPolicy::Permissive),
            "strict" => Ok(AnswerPolicy::Strict),
            other => Err(format!(
                "unknown answer policy '{other}' (expected 'permissive' or 'strict')"
            )),
        }
    }
}

/// Joins model answers back to questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    policy: AnswerPolicy,
}

impl Reconciler {
    /// Create a reconciler with the given policy.
    pub fn new(policy: AnswerPolicy) -> Self {
        Self { policy }
    }

    /// Extract answers from raw reply text and reconcile them.
    pub fn reconcile_reply(&self, questions: &[Question], reply: &str) -> Vec<ResultRecord> {
        self.reconcile(questions, &extract_answers(reply))
    }

    /// Reconcile an extraction outcome with the questions.
    pub fn reconcile(
        &self,
        questions: &[Question],
        extracted: &Result<Vec<ModelAnswer>, ExtractionError>,
    ) -> Vec<ResultRecord> {
        match extracted {
            Ok(answers) => questions
                .iter()
                .map(|q| self.reconcile_one(q, answers))
                .collect(),
            Err(e) => {
                warn!(error = %e, questions = questions.len(), "Model reply unusable, falling back");
                fallback_all(questions, &ModelStatus::failed(PARSE_FAILURE_ERROR))
            }
        }
    }

    fn reconcile_one(&self, question: &Question, answers: &[ModelAnswer]) -> ResultRecord {
        let matched = question
            .id
            .as_ref()
            .and_then(|id| answers.iter().find(|a| &a.id == id));

        let Some(model_answer) = matched else {
            debug!(question_id = ?question.id, "No model entry for question");
            return ResultRecord::from_fallback(question, ModelStatus::failed(NO_ANSWER_ERROR));
        };

        let Some(answer) = model_answer.usable_answer() else {
            debug!(question_id = ?question.id, "Model entry has no usable answer");
            return ResultRecord::from_fallback(question, ModelStatus::failed(NO_ANSWER_ERROR));
        };

        if self.policy == AnswerPolicy::Strict {
            if let Some(options) = question.choices() {
                if !answer.is_within(options) {
                    debug!(question_id = ?question.id, "Model answer outside options");
                    return ResultRecord::from_fallback(
                        question,
                        ModelStatus::failed(OPTION_MISMATCH_ERROR),
                    );
                }
            }
        }

        ResultRecord::from_model(question, answer.clone(), model_answer.clone())
    }
}
