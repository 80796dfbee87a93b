//! Table file processing.
//!
//! Runs every row of one input table through a [`Pipeline`] with progress
//! tracking, printing a diagnostic for each row whose payload could not be
//! parsed and carrying on with the next one.

use crate::audit::pipeline::{Batch, Pipeline};
use crate::config::PipelineConfig;
use crate::utils::format::format_number;
use crate::utils::progress::ProgressBar;
use crate::utils::table::TableReader;
use anyhow::{Context, Result};

/// Processes one audit log export table
pub struct TableProcessor<'a> {
    path: &'a str,
    config: &'a PipelineConfig,
    progress_label: String,
    show_progress: bool,
    quiet: bool,
}

impl<'a> TableProcessor<'a> {
    pub fn new(path: &'a str, config: &'a PipelineConfig) -> Self {
        Self {
            path,
            config,
            progress_label: "Processing".to_string(),
            show_progress: true,
            quiet: false,
        }
    }

    #[must_use]
    pub fn progress_label(mut self, label: &str) -> Self {
        self.progress_label = label.to_string();
        self
    }

    /// Draw a progress bar (off when several tables are processed at once)
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Suppress the progress bar and per-row diagnostics
    #[must_use]
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Read the whole table into a batch
    pub fn process(self) -> Result<Batch> {
        let pipeline = Pipeline::new(self.config);
        let mut table = TableReader::open(self.path)?;
        let payload_index = self
            .config
            .payload_column
            .resolve(table.headers())
            .with_context(|| format!("Cannot locate payload column in {}", self.path))?;

        // Compressed sizes don't track bytes read from the decoder
        let file_size = if crate::utils::reader::is_compressed(self.path) {
            None
        } else {
            std::fs::metadata(self.path).ok().map(|m| m.len() as usize)
        };
        let progress = if self.quiet || !self.show_progress {
            ProgressBar::hidden()
        } else if let Some(size) = file_size {
            ProgressBar::new(size, &self.progress_label)
        } else {
            ProgressBar::new_spinner(&self.progress_label)
        };

        let mut batch = pipeline.new_batch();
        let mut rows = 0usize;

        while let Some(row) = table
            .next_row()
            .with_context(|| format!("Failed to read table: {}", self.path))?
        {
            rows += 1;

            if let Some(diagnostic) = pipeline.process_row(&mut batch, &row, payload_index) {
                if !self.quiet {
                    progress.println(format!(
                        "[WARN] Row {}: {}",
                        diagnostic.row, diagnostic.message
                    ));
                }
            }

            // Update progress every 1k rows
            if rows % 1_000 == 0 {
                match file_size {
                    Some(size) => progress.update((table.bytes_read() as usize).min(size)),
                    None => progress.update(rows),
                }
            }
        }

        if let Some(size) = file_size {
            progress.update(size);
        }
        progress.finish_with_message(&format!(
            "Processed {} rows from {}",
            format_number(rows),
            self.path
        ));

        Ok(batch)
    }
}
