//! Extraction of structured answers from raw model text.
//!
//! Models are asked for a bare JSON array but often wrap it in a markdown
//! fence or add a sentence around it. Extraction runs in stages:
//!
//! 1. trim and strip a ```` ```json ```` opening fence and a closing fence
//! 2. [`parse_direct`]: parse the remaining text as JSON
//! 3. [`parse_bracketed`]: parse the span from the first `[` to the last `]`
//!
//! The bracketed stage is greedy. With trailing prose that contains another
//! `]` it captures too much and fails, which then surfaces as a parse failure
//! rather than a wrong answer.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::answer::ModelAnswer;

lazy_static! {
    /// Opening ```` ```json ```` fence at the start of any line.
    static ref FENCE_OPEN: Regex = Regex::new(r"(?im)^```json\s*").unwrap();

    /// Closing fence at the end of any line.
    static ref FENCE_CLOSE: Regex = Regex::new(r"(?m)```\s*$").unwrap();

    /// First `[` through last `]`, across lines.
    static ref BRACKETED_ARRAY: Regex = Regex::new(r"(?s)\[.*\]").unwrap();
}

/// Why a reply yielded no answer list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Model reply was empty")]
    Empty,

    #[error("Model reply contained no parseable JSON")]
    NoJson,

    #[error("Model reply was JSON but not an array (found {found})")]
    NotAnArray { found: &'static str },
}

/// Trim the reply and remove markdown code fences.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let opened = FENCE_OPEN.replace(trimmed, "");
    FENCE_CLOSE.replace(&opened, "").into_owned()
}

/// Parse the whole text as JSON.
pub fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Parse the first bracketed span of the text as JSON.
pub fn parse_bracketed(text: &str) -> Option<Value> {
    let span = BRACKETED_ARRAY.find(text)?;
    serde_json::from_str(span.as_str()).ok()
}

/// Extract `{id, answer}` entries from a model reply.
///
/// Array items that are not objects with a string or numeric `id` are
/// skipped.
pub fn extract_answers(reply: &str) -> Result<Vec<ModelAnswer>, ExtractionError> {
    let text = strip_code_fence(reply);
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }

    let value = match parse_direct(&text) {
        Some(value) => value,
        None => {
            debug!("Direct parse failed, searching for bracketed array");
            parse_bracketed(&text).ok_or(ExtractionError::NoJson)?
        }
    };

    let Value::Array(items) = value else {
        return Err(ExtractionError::NotAnArray {
            found: json_kind(&value),
        });
    };

    let total = items.len();
    let answers: Vec<ModelAnswer> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ModelAnswer>(item) {
            Ok(answer) => Some(answer),
            Err(e) => {
                debug!(error = %e, "Skipping malformed answer entry");
                None
            }
        })
        .collect();

    debug!(total, kept = answers.len(), "Extracted model answers");
    Ok(answers)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
