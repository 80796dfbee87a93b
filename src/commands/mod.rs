//! Command implementations.
//!
//! - [`flatten`] - Flatten audit log exports into schema-unified CSV plus an IP report
//! - [`ip_report`] - Client IP aggregate only, across one or more exports

pub mod flatten;
pub mod ip_report;
