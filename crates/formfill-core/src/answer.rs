//! Answer values and model-provided answers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::question::QuestionId;

/// An answer to a single question.
///
/// Model answers are kept verbatim: a string, a list of strings, or any
/// other JSON value the model chose to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Single option or free text
    Text(String),

    /// Several options (checkbox questions)
    Choices(Vec<String>),

    /// Anything else
    Other(Value),
}

impl Answer {
    /// Whether this answer can be used instead of the fallback.
    ///
    /// Empty strings and empty lists are not usable; `null` never is.
    pub fn is_usable(&self) -> bool {
        match self {
            Answer::Text(s) => !s.is_empty(),
            Answer::Choices(c) => !c.is_empty(),
            Answer::Other(v) => match v {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                _ => true,
            },
        }
    }

    /// Whether every selected value is one of `options`.
    pub fn is_within(&self, options: &[String]) -> bool {
        match self {
            Answer::Text(s) => options.contains(s),
            Answer::Choices(c) => c.iter().all(|choice| options.contains(choice)),
            Answer::Other(_) => false,
        }
    }
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Answer::Text(s.to_string())
    }
}

impl From<String> for Answer {
    fn from(s: String) -> Self {
        Answer::Text(s)
    }
}

impl From<Vec<String>> for Answer {
    fn from(choices: Vec<String>) -> Self {
        Answer::Choices(choices)
    }
}

/// One `{id, answer}` entry extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnswer {
    /// Question identifier the model answered
    pub id: QuestionId,

    /// The model's answer, if it gave one
    #[serde(default)]
    pub answer: Option<Answer>,
}

impl ModelAnswer {
    /// Create a model answer.
    pub fn new(id: impl Into<QuestionId>, answer: impl Into<Answer>) -> Self {
        Self {
            id: id.into(),
            answer: Some(answer.into()),
        }
    }

    /// The answer, if present and usable.
    pub fn usable_answer(&self) -> Option<&Answer> {
        self.answer.as_ref().filter(|a| a.is_usable())
    }
}
