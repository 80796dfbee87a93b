//! Output column ordering.
//!
//! [`RecordOrderer`] puts one record's lead fields first. [`SchemaUnifier`]
//! collects every field name seen across the batch and, once all records are
//! in, fixes the output column list: lead fields in their configured order,
//! then every other field in lexicographic order. The result depends only on
//! the set of records observed, not the order they arrived in.

use super::types::{CanonicalRecord, FlatRecord};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema already finalized; no further records can be observed")]
    AlreadyFinalized,
}

/// Reorders flat records so the lead fields come first
#[derive(Debug, Clone)]
pub struct RecordOrderer {
    lead_fields: Vec<String>,
}

impl RecordOrderer {
    pub fn new(lead_fields: Vec<String>) -> Self {
        Self { lead_fields }
    }

    pub fn lead_fields(&self) -> &[String] {
        &self.lead_fields
    }

    /// Lead fields (empty when missing), then the remaining fields in record order
    pub fn order(&self, mut flat: FlatRecord) -> CanonicalRecord {
        let mut fields = Vec::with_capacity(self.lead_fields.len() + flat.len());

        for lead in &self.lead_fields {
            let value = flat.remove(lead).unwrap_or_default();
            fields.push((lead.clone(), value));
        }
        fields.extend(flat);

        CanonicalRecord::from_fields(fields)
    }
}

#[derive(Debug, Clone)]
enum State {
    Accumulating(BTreeSet<String>),
    Finalized(Vec<String>),
}

/// Tracks the union of field names across a batch
#[derive(Debug, Clone)]
pub struct SchemaUnifier {
    lead_fields: Vec<String>,
    state: State,
}

impl SchemaUnifier {
    pub fn new(lead_fields: Vec<String>) -> Self {
        Self {
            lead_fields,
            state: State::Accumulating(BTreeSet::new()),
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Finalized(_))
    }

    pub fn observe(&mut self, record: &CanonicalRecord) -> Result<(), SchemaError> {
        match &mut self.state {
            State::Accumulating(seen) => {
                for name in record.names() {
                    if !seen.contains(name) {
                        seen.insert(name.to_string());
                    }
                }
                Ok(())
            }
            State::Finalized(_) => Err(SchemaError::AlreadyFinalized),
        }
    }

    /// Union another unifier's observations into this one
    pub fn merge(&mut self, other: SchemaUnifier) -> Result<(), SchemaError> {
        let State::Accumulating(theirs) = other.state else {
            return Err(SchemaError::AlreadyFinalized);
        };
        match &mut self.state {
            State::Accumulating(ours) => {
                ours.extend(theirs);
                Ok(())
            }
            State::Finalized(_) => Err(SchemaError::AlreadyFinalized),
        }
    }

    /// Fix the column order. Later calls return the same columns.
    pub fn finalize(&mut self) -> &[String] {
        if let State::Accumulating(seen) = &mut self.state {
            let seen = std::mem::take(seen);
            let mut columns = self.lead_fields.clone();
            columns.extend(
                seen.into_iter()
                    .filter(|name| !self.lead_fields.contains(name)),
            );
            self.state = State::Finalized(columns);
        }

        match &self.state {
            State::Finalized(columns) => columns,
            State::Accumulating(_) => unreachable!("state was finalized above"),
        }
    }
}
