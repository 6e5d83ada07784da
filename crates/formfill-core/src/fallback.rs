//! Deterministic fallback answers.
//!
//! Used whenever the model cannot supply an answer: no credential, a failed
//! call, an unparseable reply, or a reply that skipped a question.

use crate::answer::Answer;
use crate::question::{Question, QuestionType};
use crate::result::{ModelStatus, ResultRecord};

/// Default answer for a question.
///
/// - first option when the question has a non-empty option list
/// - empty string for text questions
/// - `None` otherwise
pub fn resolve(question: &Question) -> Option<Answer> {
    if let Some(options) = question.choices() {
        return options.first().cloned().map(Answer::Text);
    }

    if question.is(&QuestionType::Text) {
        return Some(Answer::Text(String::new()));
    }

    None
}

/// Fall back for every question with the same model status.
pub fn fallback_all(questions: &[Question], status: &ModelStatus) -> Vec<ResultRecord> {
    questions
        .iter()
        .map(|q| ResultRecord::from_fallback(q, status.clone()))
        .collect()
}
