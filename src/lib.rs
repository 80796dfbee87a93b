//! # M365 Audit Tools
//!
//! Command-line tools for turning Microsoft 365 unified audit log exports
//! into flat, analysis-ready tables for offline forensic and compliance review.
//!
//! ## Overview
//!
//! Audit log exports are CSV tables in which one column (`AuditData`) holds
//! a JSON payload whose shape differs from one operation to the next, and
//! which is often damaged on the way out: quotes doubled, lines wrapped,
//! trailing commas left behind. This crate repairs and parses every payload,
//! flattens nested structures into scalar columns, unifies the columns of all
//! rows into one stable header and counts the client IP addresses seen.
//!
//! ## Features
//!
//! - **Payload repair** - doubled quotes, `\/` escapes, embedded line breaks, trailing commas
//! - **Never drops a row** - unparseable payloads are kept verbatim and flagged
//! - **Deterministic schema** - configurable lead columns, then all others sorted
//! - **Client IP aggregation** - consolidated per row and counted across the run
//! - **Compressed File Support** - direct processing of `.gz` and `.zst` exports
//! - **Parallel Processing** - several exports processed concurrently, optionally merged
//! - **Shell completion** for bash, zsh, fish, powershell, and elvish
//!
//! ## Architecture
//!
//! - [`audit`] - The normalization pipeline (sanitize, parse, flatten, order, unify)
//! - [`commands`] - Command implementations
//! - [`config`] - Pipeline settings, config file loading and CLI overrides
//! - [`utils`] - Table I/O, parallel processing, progress, formatting
//!
//! ## Example Usage
//!
//! ```bash
//! # Flatten one export (writes AuditLog_processed.csv and AuditLog_ip_report.txt)
//! m365-audit flatten AuditLog.csv
//!
//! # Merge several exports into one chronologically sorted table
//! m365-audit flatten jan.csv.gz feb.csv.gz --merge --sort-by-time -o q1.csv
//!
//! # Top client IPs only
//! m365-audit ip-report AuditLog.csv --top 25
//! ```

pub mod audit;
pub mod commands;
pub mod config;
pub mod utils;
