//! Question records and payload normalization.
//!
//! Inbound payloads arrive in more than one shape. The normalizer turns any
//! of them into a flat list of [`Question`] records and never fails: shapes
//! it does not recognize produce an empty list.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The kind of form item a question represents.
///
/// Unrecognized type strings are preserved in [`QuestionType::Other`] so they
/// can be echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    /// Select exactly one option
    MultipleChoice,

    /// Select one or more options
    Checkbox,

    /// Select exactly one option from a dropdown
    Dropdown,

    /// Free text answer
    Text,

    /// Any other type string
    Other(String),
}

impl QuestionType {
    /// Wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Dropdown => "dropdown",
            QuestionType::Text => "text",
            QuestionType::Other(s) => s,
        }
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "multiple_choice" => QuestionType::MultipleChoice,
            "checkbox" => QuestionType::Checkbox,
            "dropdown" => QuestionType::Dropdown,
            "text" => QuestionType::Text,
            _ => QuestionType::Other(s),
        }
    }
}

impl From<QuestionType> for String {
    fn from(kind: QuestionType) -> Self {
        match kind {
            QuestionType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question identifier, kept in the JSON form it arrived in.
///
/// Ids match only when both kind and value agree: `"7"` never matches `7`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Text(String),
    Number(serde_json::Number),
}

impl QuestionId {
    /// Id from a JSON value; only strings and numbers qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(QuestionId::Text(s.clone())),
            Value::Number(n) => Some(QuestionId::Number(n.clone())),
            _ => None,
        }
    }
}

impl PartialEq for QuestionId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QuestionId::Text(a), QuestionId::Text(b)) => a == b,
            // 7 and 7.0 are the same JSON number
            (QuestionId::Number(a), QuestionId::Number(b)) => a.as_f64() == b.as_f64(),
            _ => false,
        }
    }
}

impl PartialEq<&str> for QuestionId {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, QuestionId::Text(s) if s == other)
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        QuestionId::Text(s.to_string())
    }
}

impl From<String> for QuestionId {
    fn from(s: String) -> Self {
        QuestionId::Text(s)
    }
}

impl From<u64> for QuestionId {
    fn from(n: u64) -> Self {
        QuestionId::Number(n.into())
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionId::Text(s) => f.write_str(s),
            QuestionId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A single form question.
///
/// Only `id`, `type` and `options` are interpreted. Every other field
/// (question text, help text, flags) is kept in `extra` and serialized back
/// into the prompt untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier used to match model answers
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<QuestionId>,

    /// Question type
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<QuestionType>,

    /// Ordered choice list
    #[serde(
        default,
        deserialize_with = "lenient_options",
        skip_serializing_if = "Option::is_none"
    )]
    pub options: Option<Vec<String>>,

    /// Opaque fields carried through to the prompt
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Question {
    /// Create a question with an id and type.
    pub fn new(id: impl Into<QuestionId>, kind: QuestionType) -> Self {
        Self {
            id: Some(id.into()),
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Set the option list.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Set an opaque field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Build a question from an arbitrary JSON value.
    ///
    /// Values that are not JSON objects become an empty question, so the
    /// number of questions always matches the number of input items.
    pub fn from_value(value: &Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(question) => question,
            Err(e) => {
                tracing::debug!(error = %e, "Question item is not an object, using empty question");
                Self::default()
            }
        }
    }

    /// Non-empty option list, if any.
    pub fn choices(&self) -> Option<&[String]> {
        self.options.as_deref().filter(|o| !o.is_empty())
    }

    /// Whether this question has the given type.
    pub fn is(&self, kind: &QuestionType) -> bool {
        self.kind.as_ref() == Some(kind)
    }
}

/// Extract the list of questions from a request payload.
///
/// - `payload.questions` is an array: each element becomes a question.
/// - `payload.question` is truthy: the payload itself is one question.
/// - Anything else: no questions.
pub fn normalize_payload(payload: &Value) -> Vec<Question> {
    if let Some(items) = payload.get("questions").and_then(Value::as_array) {
        return items.iter().map(Question::from_value).collect();
    }

    if payload.get("question").is_some_and(is_truthy) {
        return vec![Question::from_value(payload)];
    }

    Vec::new()
}

/// Loose truthiness used when sniffing payload shapes.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<QuestionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(QuestionId::from_value(&value))
}

fn lenient_type<'de, D>(deserializer: D) -> Result<Option<QuestionType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(QuestionType::from(s)),
        _ => None,
    })
}

fn lenient_options<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_questions_array_used_as_is() {
        let payload = json!({
            "questions": [
                {"id": "q1", "type": "text", "question": "Your name?"},
                {"id": "q2", "type": "dropdown", "options": ["A", "B"]}
            ]
        });

        let questions = normalize_payload(&payload);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, Some(QuestionId::from("q1")));
        assert_eq!(questions[0].kind, Some(QuestionType::Text));
        assert_eq!(questions[0].extra["question"], "Your name?");
        assert_eq!(questions[1].choices(), Some(&["A".to_string(), "B".to_string()][..]));
    }

    #[test]
    fn test_single_question_payload_is_wrapped() {
        let payload = json!({"id": "solo", "type": "text", "question": "Capital of France?"});
        let questions = normalize_payload(&payload);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, Some(QuestionId::from("solo")));
    }

    #[test]
    fn test_unknown_shapes_are_empty() {
        assert!(normalize_payload(&json!({})).is_empty());
        assert!(normalize_payload(&json!({"question": ""})).is_empty());
        assert!(normalize_payload(&json!({"questions": "nope"})).is_empty());
        assert!(normalize_payload(&json!([1, 2, 3])).is_empty());
        assert!(normalize_payload(&Value::Null).is_empty());
    }

    #[test]
    fn test_non_object_items_keep_their_slot() {
        let payload = json!({"questions": ["bare string", {"id": "q2", "type": "text"}]});
        let questions = normalize_payload(&payload);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0], Question::default());
        assert_eq!(questions[1].id, Some(QuestionId::from("q2")));
    }

    #[test]
    fn test_lenient_fields() {
        let q = Question::from_value(&json!({"id": 7, "type": 3, "options": [1, "two", true]}));
        assert_eq!(q.id, Some(QuestionId::from(7u64)));
        assert_eq!(q.kind, None);
        assert_eq!(
            q.options,
            Some(vec!["1".to_string(), "two".to_string(), "true".to_string()])
        );

        let q = Question::from_value(&json!({"id": null, "options": "A,B"}));
        assert_eq!(q.id, None);
        assert_eq!(q.options, None);
    }

    #[test]
    fn test_id_keeps_json_kind() {
        let numeric = Question::from_value(&json!({"id": 7, "type": "text"}));
        let text = Question::from_value(&json!({"id": "7", "type": "text"}));

        assert_ne!(numeric.id, text.id);
        assert_eq!(serde_json::to_value(&numeric).unwrap()["id"], json!(7));
        assert_eq!(serde_json::to_value(&text).unwrap()["id"], json!("7"));

        assert_eq!(QuestionId::from_value(&json!(7.0)), Some(QuestionId::from(7u64)));
        assert_eq!(QuestionId::from_value(&json!(true)), None);
        assert_eq!(QuestionId::from(7u64).to_string(), "7");
    }

    #[test]
    fn test_unknown_type_round_trips() {
        let q = Question::from_value(&json!({"id": "q", "type": "linear_scale"}));
        assert_eq!(q.kind, Some(QuestionType::Other("linear_scale".to_string())));

        let back = serde_json::to_value(&q).unwrap();
        assert_eq!(back["type"], "linear_scale");
    }

    #[test]
    fn test_serialization_keeps_opaque_fields() {
        let q = Question::new("q1", QuestionType::MultipleChoice)
            .with_options(["Red", "Blue"])
            .with_field("question", "Favourite colour?");

        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["id"], "q1");
        assert_eq!(value["type"], "multiple_choice");
        assert_eq!(value["options"], json!(["Red", "Blue"]));
        assert_eq!(value["question"], "Favourite colour?");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }
}
