//! Audit payload normalization.
//!
//! Components, leaves first:
//!
//! - [`sanitizer`] - Repairs malformed JSON text before parsing
//! - [`parser`] - Turns sanitized text into a record or an explicit failure
//! - [`flatten`] - Collapses nested records into scalar fields
//! - [`ip`] - Client IP extraction and run-wide occurrence counts
//! - [`schema`] - Lead-field ordering and output column unification
//! - [`pipeline`] - Batch driver wiring the components together
//! - [`types`] - Data structures shared by all of the above
//!
//! # Example
//!
//! ```
//! use m365_audit_tools::audit::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::default();
//! let mut batch = pipeline.new_batch();
//! pipeline.process_payload(&mut batch, r#"{""Operation"":""FileAccessed"",""ClientIP"":""10.0.0.1""}"#, 2);
//! pipeline.process_payload(&mut batch, "{not valid json", 3);
//!
//! let output = batch.finish();
//! assert_eq!(output.records.len(), 2);
//! assert_eq!(output.ips.report_lines(), vec!["10.0.0.1 - 1 occurrences"]);
//! ```

pub mod flatten;
pub mod ip;
pub mod parser;
pub mod pipeline;
pub mod sanitizer;
pub mod schema;
pub mod types;
