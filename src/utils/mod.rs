//! Utility functions and helpers.
//!
//! This module provides the I/O glue around the normalization pipeline:
//!
//! - [`reader`] - File opening with automatic decompression
//! - [`table`] - CSV row reading and output/report writing
//! - [`processor`] - One-table processing with progress and diagnostics
//! - [`parallel`] - Concurrent processing of several tables
//! - [`progress`] - Progress bar display
//! - [`format`] - Number formatting for summaries
//! - [`time`] - `CreationTime` parsing and chronological sorting
//!
//! # Examples
//!
//! ## Reading an export table
//!
//! ```no_run
//! use m365_audit_tools::utils::table::TableReader;
//!
//! // Automatically decompresses .gz and .zst files
//! let mut table = TableReader::open("AuditLog.csv.gz").unwrap();
//! while let Some(row) = table.next_row().unwrap() {
//!     println!("line {}: {:?}", row.line, row.get("AuditData"));
//! }
//! ```

pub mod format;
pub mod parallel;
pub mod processor;
pub mod progress;
pub mod reader;
pub mod table;
pub mod time;
