//! Data structures flowing through the record normalization pipeline.
//!
//! A [`RawRow`] comes straight from the source table. Its payload column is
//! parsed into an [`AuditRecord`] (or a failure, see [`ParseOutcome`]),
//! flattened into a [`FlatRecord`] and finally reordered into a
//! [`CanonicalRecord`] ready to be written against the unified schema.

use super::parser::PayloadError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Parsed payload content: a JSON object keyed by string.
pub type AuditRecord = Map<String, Value>;

/// Flattened record: flattened field name to scalar text.
///
/// Iteration order is lexicographic by field name, which is the order the
/// non-lead fields of a record keep until the schema is finalized.
pub type FlatRecord = BTreeMap<String, String>;

/// One data row of the source table, as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Physical line number of the row in the source table (header is line 1)
    pub line: usize,
    /// Column name / cell text pairs, in source column order
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(line: usize, cells: Vec<(String, String)>) -> Self {
        Self { line, cells }
    }

    /// Cell text of the named column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Cell text at a zero-based column position
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|(_, value)| value.as_str())
    }
}

/// Result of parsing one payload. Every raw row yields exactly one outcome.
#[derive(Debug)]
pub enum ParseOutcome {
    Success(AuditRecord),
    Failure {
        reason: PayloadError,
        /// Payload text exactly as it appeared in the source table
        raw: String,
    },
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The parsed record, if parsing succeeded
    pub fn record(&self) -> Option<&AuditRecord> {
        match self {
            Self::Success(record) => Some(record),
            Self::Failure { .. } => None,
        }
    }
}

/// A flat record with lead fields first, then the record's remaining fields.
///
/// Field names are unique within a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecord {
    fields: Vec<(String, String)>,
}

impl CanonicalRecord {
    pub(crate) fn from_fields(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Field names in canonical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Value of a field, if present on this record
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Lay the record out against a finalized column list.
    ///
    /// Columns the record does not carry are emitted as empty strings.
    pub fn to_row(&self, columns: &[String]) -> Vec<String> {
        let lookup: HashMap<&str, &str> = self
            .fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        columns
            .iter()
            .map(|column| lookup.get(column.as_str()).copied().unwrap_or("").to_string())
            .collect()
    }
}
