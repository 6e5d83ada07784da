//! Prompt construction for the answer model.
//!
//! The prompt is a fixed instruction block around the pretty-printed
//! question list. Reply format rules come last so they sit closest to the
//! point where the model starts writing.

use crate::question::Question;
use crate::CoreError;

/// Question types the model must understand and the answer shape for each.
pub const QUESTION_TYPES_PROMPT: &str = r#"You are given questions in JSON format. Each question has a "type" field that can be:
- "multiple_choice": Select one option from the provided options
- "checkbox": Select one or more options from the provided options (answer should be an array)
- "dropdown": Select one option from the provided options
- "text": Provide a text answer (no options provided)

Respond with a JSON array containing objects with ONLY two keys: "id" and "answer".
The "id" must match the input question id exactly.
"#;

/// Answer rules per question type.
pub const ANSWER_RULES_PROMPT: &str = r#"For multiple_choice, dropdown: "answer" must be exactly one of the provided options.
For checkbox: "answer" should be an array with one or more of the provided options.
For text questions:
  - If the question asks for personal information like Name, Enrollment Number, Roll Number, Email, Phone, Address, Class, Group, ID, Registration, Student Number, etc., return an empty string "".
  - Otherwise, provide a relevant factual answer based on the question content.
"#;

/// Required reply format.
pub const RESPONSE_FORMAT_PROMPT: &str = r#"Respond ONLY with a JSON array in this exact format:
[
  {"id": "question_id_1", "answer": "option text"},
  {"id": "question_id_2", "answer": ["option1", "option2"]},
  {"id": "question_id_3", "answer": ""},
  {"id": "question_id_4", "answer": "factual answer"}
]

Do not include any explanations, markdown formatting, or extra text."#;

/// Build the prompt for a batch of questions.
pub fn build_prompt(questions: &[Question]) -> Result<String, CoreError> {
    let serialized = serde_json::to_string_pretty(questions)?;

    Ok(format!(
        "{QUESTION_TYPES_PROMPT}\n{ANSWER_RULES_PROMPT}\nInput questions:\n{serialized}\n\n{RESPONSE_FORMAT_PROMPT}"
    ))
}
