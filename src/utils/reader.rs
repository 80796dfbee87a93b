//! Input file opening with automatic decompression.
//!
//! Audit log exports are often archived compressed. Input tables can be read
//! directly from:
//!
//! - Plain files
//! - Gzip compressed files (.gz)
//! - Zstandard compressed files (.zst)
//!
//! # Examples
//!
//! ```no_run
//! use m365_audit_tools::utils::reader::open_file;
//!
//! // Automatically handles .gz, .zst, or plain text
//! let reader = open_file("AuditLog_2024-01.csv.gz").unwrap();
//! let mut table = csv::Reader::from_reader(reader);
//! ```

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Opens a file, decompressing based on its extension.
///
/// - `.gz` → Gzip decompression
/// - `.zst` → Zstandard decompression
/// - Otherwise → Plain file
pub fn open_file(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    match extension(path) {
        "gz" => Ok(Box::new(GzDecoder::new(file))),
        "zst" => {
            let decoder = zstd::Decoder::new(file).with_context(|| {
                format!("Failed to create zstd decoder for: {}", path.display())
            })?;
            Ok(Box::new(decoder))
        }
        _ => Ok(Box::new(file)),
    }
}

/// Whether the path names a compressed file this module can read
pub fn is_compressed(path: impl AsRef<Path>) -> bool {
    matches!(extension(path.as_ref()), "gz" | "zst")
}

/// File name with any compression suffix and then the table extension removed.
///
/// `exports/AuditLog.csv.gz` → `AuditLog`
pub fn table_stem(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");

    let name = if is_compressed(path) {
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    } else {
        name
    };
    name.rsplit_once('.')
        .map_or(name, |(stem, _)| stem)
        .to_string()
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}
