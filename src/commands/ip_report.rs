//! Client IP aggregate report.
//!
//! Runs exports through the normalization pipeline and emits only the
//! client IP aggregate, counted once per record, across all input files.
//!
//! # Usage
//!
//! ```bash
//! # Ranked report on stdout
//! m365-audit ip-report AuditLog.csv
//!
//! # Top 20 addresses across several exports, written to a file
//! m365-audit ip-report jan.csv feb.csv --top 20 --output top_ips.txt
//!
//! # Distinct addresses only
//! m365-audit ip-report AuditLog.csv --format unique
//! ```

use crate::config::PipelineConfig;
use crate::utils::format::format_number;
use crate::utils::parallel::{merge_batches, process_files_parallel};
use crate::utils::processor::TableProcessor;
use crate::utils::table::{write_ip_report, write_ip_report_file, IpReportFormat};
use anyhow::{Context, Result};
use std::io::stdout;

pub fn run(
    input_files: &[String],
    config: &PipelineConfig,
    output: Option<&str>,
    format: IpReportFormat,
    top: Option<usize>,
) -> Result<()> {
    let show_progress = input_files.len() == 1;
    let results = process_files_parallel(input_files, |path| {
        TableProcessor::new(path, config)
            .progress_label("Scanning")
            .show_progress(show_progress)
            .process()
    })?;

    let output_batch = merge_batches(results)?.finish();
    let ips = &output_batch.ips;

    eprintln!(
        "\nFound {} distinct client IPs in {} rows ({} unparseable)",
        format_number(ips.len()),
        format_number(output_batch.stats.total_rows),
        format_number(output_batch.stats.failed_rows)
    );

    match output {
        Some(path) => {
            write_ip_report_file(path, ips, format, top)?;
            println!("IP report written to: {}", path);
        }
        None => {
            write_ip_report(stdout().lock(), ips, format, top)
                .context("Failed to write IP report to stdout")?;
        }
    }

    Ok(())
}
