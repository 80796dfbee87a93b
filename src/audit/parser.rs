//! Payload parsing.
//!
//! Parsing is row-local: a payload that cannot be parsed yields a
//! [`ParseOutcome::Failure`] carrying the original text, and the batch moves
//! on to the next row.

use super::sanitizer::Sanitizer;
use super::types::ParseOutcome;
use serde_json::Value;
use thiserror::Error;

/// Why a payload could not be turned into an audit record
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("row {row}: invalid JSON payload: {source}")]
    InvalidJson {
        row: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("row {row}: payload is a JSON {kind}, expected an object")]
    NotAnObject { row: usize, kind: &'static str },
}

impl PayloadError {
    /// Source table line the failure belongs to
    pub fn row(&self) -> usize {
        match self {
            Self::InvalidJson { row, .. } | Self::NotAnObject { row, .. } => *row,
        }
    }
}

/// Sanitizes and parses payload text
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadParser {
    sanitizer: Sanitizer,
}

impl PayloadParser {
    pub fn new(sanitizer: Sanitizer) -> Self {
        Self { sanitizer }
    }

    /// Parse one payload. `row` is only used to label failures.
    pub fn parse(&self, text: &str, row: usize) -> ParseOutcome {
        let sanitized = self.sanitizer.sanitize(text);

        let failure = |reason| ParseOutcome::Failure {
            reason,
            raw: text.to_string(),
        };

        match serde_json::from_str::<Value>(&sanitized) {
            Ok(Value::Object(record)) => ParseOutcome::Success(record),
            Ok(other) => failure(PayloadError::NotAnObject {
                row,
                kind: json_kind(&other),
            }),
            Err(source) => failure(PayloadError::InvalidJson { row, source }),
        }
    }
}

/// Parse with the default sanitizer settings
pub fn parse(text: &str, row: usize) -> ParseOutcome {
    PayloadParser::default().parse(text, row)
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
