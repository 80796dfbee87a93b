//! Client IP extraction and cross-record aggregation.
//!
//! Each record contributes the set of non-empty values found under the
//! configured source fields (by default `ClientIP` and `ClientIPAddress`).
//! Because extraction yields a set, a record listing the same address under
//! two fields counts once toward the aggregate.

use super::types::AuditRecord;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Pulls client addresses out of parsed records
#[derive(Debug, Clone)]
pub struct IpExtractor {
    fields: Vec<String>,
    delimiter: String,
}

impl Default for IpExtractor {
    fn default() -> Self {
        Self::new(
            vec!["ClientIP".to_string(), "ClientIPAddress".to_string()],
            ", ",
        )
    }
}

impl IpExtractor {
    /// `fields` are top-level keys, or JSON pointers when they start with `/`.
    pub fn new(fields: Vec<String>, delimiter: impl Into<String>) -> Self {
        Self {
            fields,
            delimiter: delimiter.into(),
        }
    }

    /// Non-empty string values of the IP fields.
    ///
    /// A value already holding a delimited list is split into its addresses,
    /// so re-splitting the joined `IPAddresses` field yields the same set.
    pub fn extract(&self, record: &AuditRecord) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter_map(|field| lookup(record, field))
            .filter_map(|value| match value {
                Value::String(s) => Some(s.as_str()),
                _ => None,
            })
            .flat_map(|s| s.split(self.delimiter.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Comma-joined form written into the `IPAddresses` field
    pub fn join(&self, ips: &BTreeSet<String>) -> String {
        ips.iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&self.delimiter)
    }

    /// Inverse of [`IpExtractor::join`]
    pub fn split(&self, joined: &str) -> BTreeSet<String> {
        if joined.is_empty() {
            return BTreeSet::new();
        }
        joined.split(self.delimiter.as_str()).map(str::to_string).collect()
    }
}

fn lookup<'a>(record: &'a AuditRecord, field: &str) -> Option<&'a Value> {
    if field.starts_with('/') {
        let (head, tail) = match field[1..].find('/') {
            Some(pos) => (&field[1..=pos], &field[pos + 1..]),
            None => (&field[1..], ""),
        };
        let root = record.get(&unescape_pointer(head))?;
        if tail.is_empty() {
            Some(root)
        } else {
            root.pointer(tail)
        }
    } else {
        record.get(field)
    }
}

fn unescape_pointer(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Occurrence count per IP across a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpAggregate {
    counts: HashMap<String, usize>,
}

impl IpAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count each address of one record once
    pub fn record(&mut self, ips: &BTreeSet<String>) {
        for ip in ips {
            *self.counts.entry(ip.clone()).or_insert(0) += 1;
        }
    }

    /// Sum another aggregate into this one
    pub fn merge(&mut self, other: IpAggregate) {
        for (ip, count) in other.counts {
            *self.counts.entry(ip).or_insert(0) += count;
        }
    }

    pub fn count(&self, ip: &str) -> usize {
        self.counts.get(ip).copied().unwrap_or(0)
    }

    /// Number of distinct addresses
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Addresses by descending count, ties broken by address
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(ip, count)| (ip.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// One `"<ip> - <count> occurrences"` line per address, ranked
    pub fn report_lines(&self) -> Vec<String> {
        self.ranked()
            .into_iter()
            .map(|(ip, count)| format!("{} - {} occurrences", ip, count))
            .collect()
    }

    /// Distinct addresses in lexicographic order
    pub fn unique(&self) -> Vec<&str> {
        let mut ips: Vec<&str> = self.counts.keys().map(String::as_str).collect();
        ips.sort_unstable();
        ips
    }
}
