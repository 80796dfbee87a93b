//! Recursive flattening of audit records into scalar fields.
//!
//! Nested objects and arrays are walked depth-first; each scalar leaf becomes
//! one field whose name is the path of keys (and zero-based array indices)
//! leading to it, joined with the configured separator:
//!
//! ```
//! use m365_audit_tools::audit::flatten::Flattener;
//! use serde_json::json;
//!
//! let record = json!({"Item": {"Name": "a.txt"}, "Tags": ["x", "y"]});
//! let flat = Flattener::new("_").flatten(record.as_object().unwrap());
//!
//! assert_eq!(flat["Item_Name"], "a.txt");
//! assert_eq!(flat["Tags_1"], "y");
//! ```
//!
//! Every character of a key (or index) segment that also occurs in the
//! separator, and every backslash, is prefixed with a backslash, so two
//! different paths never flatten to the same name. The separator itself must
//! not contain a backslash.

use super::types::{AuditRecord, FlatRecord};
use serde_json::Value;

const ESCAPE: char = '\\';

/// Flattens records using a fixed path separator.
///
/// Output field names are not always the payload's key names verbatim: with
/// the default `_` separator a top-level key `Client_IP` becomes the column
/// `Client\_IP` even when nothing else would collide with it.
#[derive(Debug, Clone)]
pub struct Flattener {
    separator: String,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new("_")
    }
}

impl Flattener {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn flatten(&self, record: &AuditRecord) -> FlatRecord {
        let mut flat = FlatRecord::new();
        for (key, value) in record {
            self.walk(&self.escape(key), value, &mut flat);
        }
        flat
    }

    fn walk(&self, path: &str, value: &Value, flat: &mut FlatRecord) {
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    let child_path = self.join(path, &self.escape(key));
                    self.walk(&child_path, child, flat);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (index, child) in items.iter().enumerate() {
                    let child_path = self.join(path, &self.escape(&index.to_string()));
                    self.walk(&child_path, child, flat);
                }
            }
            leaf => {
                flat.insert(path.to_string(), stringify(leaf));
            }
        }
    }

    // Top-level keys never go through here, so an empty `path` is a real
    // (empty) key and still gets the separator.
    fn join(&self, path: &str, segment: &str) -> String {
        let mut joined = String::with_capacity(path.len() + self.separator.len() + segment.len());
        joined.push_str(path);
        joined.push_str(&self.separator);
        joined.push_str(segment);
        joined
    }

    fn escape(&self, segment: &str) -> String {
        if !segment.chars().any(|c| self.needs_escape(c)) {
            return segment.to_string();
        }

        let mut escaped = String::with_capacity(segment.len() + 2);
        for c in segment.chars() {
            if self.needs_escape(c) {
                escaped.push(ESCAPE);
            }
            escaped.push(c);
        }
        escaped
    }

    // Per character, not per separator occurrence: `a_` + `__` + `b` must
    // not read the same as `a` + `__` + `_b`.
    fn needs_escape(&self, c: char) -> bool {
        c == ESCAPE || self.separator.contains(c)
    }
}

/// Scalar text form. Empty containers keep their JSON literal.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) => "[]".to_string(),
        Value::Object(_) => "{}".to_string(),
    }
}
