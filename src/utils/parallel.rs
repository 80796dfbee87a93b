//! Parallel file processing utilities.
//!
//! Input tables are independent of each other, so several of them can be
//! normalized concurrently with Rayon. Results come back in input order so
//! that merged output keeps the order the files were given in.

use crate::audit::pipeline::Batch;
use crate::utils::format::format_number;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;

/// Result of processing a single file
#[derive(Debug)]
pub struct FileProcessResult<T> {
    pub file_path: String,
    pub data: T,
}

/// Process files concurrently, returning one result per file in input order.
///
/// A single file is processed on the calling thread.
pub fn process_files_parallel<T, F>(files: &[String], processor: F) -> Result<Vec<FileProcessResult<T>>>
where
    T: Send,
    F: Fn(&str) -> Result<T> + Send + Sync,
{
    if files.is_empty() {
        return Err(anyhow!("No files provided for processing"));
    }

    if files.len() == 1 {
        let file_path = &files[0];
        let data = processor(file_path)
            .with_context(|| format!("Failed to process file: {}", file_path))?;
        return Ok(vec![FileProcessResult {
            file_path: file_path.clone(),
            data,
        }]);
    }

    eprintln!("Processing {} files in parallel...", files.len());

    files
        .par_iter()
        .enumerate()
        .map(|(idx, file_path)| -> Result<FileProcessResult<T>> {
            let data = processor(file_path)
                .with_context(|| format!("Failed to process file: {}", file_path))?;

            eprintln!(
                "[{}/{}] Completed: {}",
                idx + 1,
                files.len(),
                file_path.split('/').next_back().unwrap_or(file_path)
            );

            Ok(FileProcessResult {
                file_path: file_path.clone(),
                data,
            })
        })
        .collect()
}

/// Reduce per-file batches into one, preserving file order
pub fn merge_batches(results: Vec<FileProcessResult<Batch>>) -> Result<Batch> {
    let mut results = results.into_iter();
    let first = results
        .next()
        .ok_or_else(|| anyhow!("No batches to merge"))?;

    let mut merged = first.data;
    for result in results {
        merged
            .merge(result.data)
            .with_context(|| format!("Failed to merge results of {}", result.file_path))?;
    }

    eprintln!(
        "Merged {} rows into one output",
        format_number(merged.stats().total_rows)
    );
    Ok(merged)
}
