//! Boundary validation for pipeline requests.
//!
//! Request bodies are checked once, in a fixed order (presence, type, length), and converted into
//! typed requests. The first failing check wins and nothing downstream runs.

use serde_json::Value;
use thiserror::Error;

/// Longest accepted document, in characters.
pub const MAX_DOCUMENT_CHARS: usize = 500_000;
/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: usize = 1_000;

const DOCUMENT_FIELD: &str = "documentText";
const QUESTION_FIELD: &str = "question";

/// Client-caused request problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Field absent, null, or empty.
    #[error("`{field}` is required")]
    Missing {
        /// Offending field name.
        field: &'static str,
    },
    /// Field present with a non-string value.
    #[error("`{field}` must be a string")]
    NotAString {
        /// Offending field name.
        field: &'static str,
    },
    /// Field longer than its limit.
    #[error("`{field}` must be at most {max} characters (got {actual})")]
    TooLong {
        /// Offending field name.
        field: &'static str,
        /// Limit in characters.
        max: usize,
        /// Observed length in characters.
        actual: usize,
    },
    /// Request body was not valid JSON.
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
}

/// A validated request to index one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocumentRequest {
    document_text: String,
}

impl IndexDocumentRequest {
    /// Validate raw document text.
    pub fn new(document_text: impl Into<String>) -> Result<Self, ValidationError> {
        let document_text = document_text.into();
        check_text(DOCUMENT_FIELD, &document_text, MAX_DOCUMENT_CHARS)?;
        Ok(Self { document_text })
    }

    /// Validate a JSON body of the form `{"documentText": "..."}`.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        Self::new(string_field(body, DOCUMENT_FIELD)?)
    }

    /// The document text.
    pub fn document_text(&self) -> &str {
        &self.document_text
    }
}

/// A validated question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerQuestionRequest {
    question: String,
}

impl AnswerQuestionRequest {
    /// Validate a raw question.
    pub fn new(question: impl Into<String>) -> Result<Self, ValidationError> {
        let question = question.into();
        check_text(QUESTION_FIELD, &question, MAX_QUESTION_CHARS)?;
        Ok(Self { question })
    }

    /// Validate a JSON body of the form `{"question": "..."}`.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        Self::new(string_field(body, QUESTION_FIELD)?)
    }

    /// The question text.
    pub fn question(&self) -> &str {
        &self.question
    }
}

fn string_field<'a>(body: &'a Value, field: &'static str) -> Result<&'a str, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ValidationError::Missing { field }),
        Some(Value::String(text)) => Ok(text),
        Some(_) => Err(ValidationError::NotAString { field }),
    }
}

fn check_text(field: &'static str, text: &str, max: usize) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    let actual = text.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_document_at_limit() {
        let text = "a".repeat(MAX_DOCUMENT_CHARS);
        let request = IndexDocumentRequest::from_json(&json!({ "documentText": text })).unwrap();
        assert_eq!(request.document_text().len(), MAX_DOCUMENT_CHARS);
    }

    #[test]
    fn rejects_document_over_limit() {
        let text = "a".repeat(600_001);
        let error = IndexDocumentRequest::from_json(&json!({ "documentText": text })).unwrap_err();
        assert_eq!(
            error,
            ValidationError::TooLong {
                field: "documentText",
                max: MAX_DOCUMENT_CHARS,
                actual: 600_001
            }
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let question = "é".repeat(MAX_QUESTION_CHARS);
        assert!(AnswerQuestionRequest::new(question).is_ok());
    }

    #[test]
    fn missing_null_and_empty_are_missing() {
        for body in [json!({}), json!({ "question": null }), json!({ "question": "" })] {
            assert_eq!(
                AnswerQuestionRequest::from_json(&body).unwrap_err(),
                ValidationError::Missing { field: "question" }
            );
        }
    }

    #[test]
    fn non_string_values_are_rejected() {
        let error = IndexDocumentRequest::from_json(&json!({ "documentText": 42 })).unwrap_err();
        assert_eq!(error, ValidationError::NotAString { field: "documentText" });
    }

    #[test]
    fn question_over_limit() {
        let error = AnswerQuestionRequest::new("q".repeat(1_001)).unwrap_err();
        assert!(matches!(error, ValidationError::TooLong { actual: 1_001, .. }));
    }
}
