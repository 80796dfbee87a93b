//! Audit log export flattening.
//!
//! Reads one or more unified audit log CSV exports, normalizes the JSON
//! payload column of every row and writes a flat, schema-unified CSV plus a
//! report of client IP addresses.
//!
//! # Usage
//!
//! ```bash
//! # Single export: writes AuditLog_processed.csv and AuditLog_ip_report.txt
//! m365-audit flatten AuditLog.csv
//!
//! # Several exports, each flattened on its own (in parallel)
//! m365-audit flatten jan.csv feb.csv.gz mar.csv.zst
//!
//! # Several exports merged into one table, sorted by CreationTime
//! m365-audit flatten jan.csv feb.csv --merge --sort-by-time --output q1.csv
//! ```
//!
//! # Output
//!
//! The output header starts with the lead fields (`CreationTime`,
//! `IPAddresses`, `Operation`, ...) followed by every other field seen in
//! any row, sorted. Rows whose payload could not be parsed keep their
//! original text in `RawPayload` and have `ParseError` set to `true`.

use crate::audit::pipeline::Batch;
use crate::config::{PipelineConfig, CREATION_TIME_FIELD};
use crate::utils::format::format_number;
use crate::utils::parallel::{merge_batches, process_files_parallel};
use crate::utils::processor::TableProcessor;
use crate::utils::reader::table_stem;
use crate::utils::table::{write_ip_report_file, write_table_file, IpReportFormat};
use crate::utils::time::sort_chronologically;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Output choices for the flatten command
#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    /// Output CSV path; defaults next to the (first) input
    pub output: Option<String>,
    /// IP report path; defaults next to the output
    pub ip_report: Option<String>,
    pub ip_format: IpReportFormat,
    pub no_ip_report: bool,
    /// Combine all inputs into one output
    pub merge: bool,
    pub sort_by_time: bool,
    /// No progress bars or per-row warnings
    pub quiet: bool,
}

/// Where one output table and its IP report go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub table: PathBuf,
    pub ip_report: Option<PathBuf>,
}

/// `<dir>/<stem>_processed.csv` and `<dir>/<stem>_ip_report.txt` beside `input`
pub fn default_output_paths(input: &str, ip_format: IpReportFormat) -> OutputPaths {
    let input = Path::new(input);
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let stem = table_stem(input);

    OutputPaths {
        table: dir.join(format!("{}_processed.csv", stem)),
        ip_report: Some(dir.join(format!("{}{}", stem, ip_report_suffix(ip_format)))),
    }
}

fn ip_report_suffix(format: IpReportFormat) -> &'static str {
    match format {
        IpReportFormat::Counts => "_ip_report.txt",
        IpReportFormat::Unique => "_unique_ips.txt",
    }
}

fn resolve_paths(input: &str, options: &FlattenOptions) -> OutputPaths {
    let mut paths = match &options.output {
        Some(output) => {
            let output = Path::new(output);
            let dir = output.parent().unwrap_or_else(|| Path::new(""));
            OutputPaths {
                table: output.to_path_buf(),
                ip_report: Some(dir.join(format!(
                    "{}{}",
                    table_stem(output),
                    ip_report_suffix(options.ip_format)
                ))),
            }
        }
        None => default_output_paths(input, options.ip_format),
    };

    if options.no_ip_report {
        paths.ip_report = None;
    } else if let Some(ip_report) = &options.ip_report {
        paths.ip_report = Some(PathBuf::from(ip_report));
    }
    paths
}

pub fn run(input_files: &[String], config: &PipelineConfig, options: &FlattenOptions) -> Result<()> {
    if input_files.is_empty() {
        bail!("No input files provided");
    }
    let separate = input_files.len() > 1 && !options.merge;
    if separate && (options.output.is_some() || options.ip_report.is_some()) {
        bail!("--output and --ip-report need --merge when several input files are given");
    }

    let show_progress = input_files.len() == 1;
    let results = process_files_parallel(input_files, |path| {
        TableProcessor::new(path, config)
            .progress_label("Flattening")
            .show_progress(show_progress)
            .quiet(options.quiet)
            .process()
    })?;

    if separate {
        for result in results {
            let paths = resolve_paths(&result.file_path, options);
            emit(result.data, &paths, options)?;
        }
    } else {
        let paths = resolve_paths(&input_files[0], options);
        emit(merge_batches(results)?, &paths, options)?;
    }

    Ok(())
}

fn emit(batch: Batch, paths: &OutputPaths, options: &FlattenOptions) -> Result<()> {
    let mut output = batch.finish();
    if options.sort_by_time {
        sort_chronologically(&mut output.records, CREATION_TIME_FIELD);
    }

    write_table_file(&paths.table, &output)?;
    if let Some(ip_path) = &paths.ip_report {
        write_ip_report_file(ip_path, &output.ips, options.ip_format, None)?;
    }

    if !options.quiet {
        output.stats.report();
        eprintln!("  Output columns: {}", format_number(output.columns.len()));
        eprintln!("  Distinct client IPs: {}", format_number(output.ips.len()));
    }

    println!("Done. Output written to: {}", paths.table.display());
    if let Some(ip_path) = &paths.ip_report {
        println!("IP report written to: {}", ip_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_paths() {
        let paths = default_output_paths("exports/AuditLog.csv.gz", IpReportFormat::Counts);
        assert_eq!(paths.table, PathBuf::from("exports/AuditLog_processed.csv"));
        assert_eq!(
            paths.ip_report,
            Some(PathBuf::from("exports/AuditLog_ip_report.txt"))
        );

        let paths = default_output_paths("AuditLog.csv", IpReportFormat::Unique);
        assert_eq!(paths.table, PathBuf::from("AuditLog_processed.csv"));
        assert_eq!(paths.ip_report, Some(PathBuf::from("AuditLog_unique_ips.txt")));
    }

    #[test]
    fn test_explicit_output_and_no_report() {
        let options = FlattenOptions {
            output: Some("out/q1.csv".to_string()),
            ..Default::default()
        };
        let paths = resolve_paths("jan.csv", &options);
        assert_eq!(paths.table, PathBuf::from("out/q1.csv"));
        assert_eq!(paths.ip_report, Some(PathBuf::from("out/q1_ip_report.txt")));

        let options = FlattenOptions {
            no_ip_report: true,
            ..Default::default()
        };
        assert_eq!(resolve_paths("jan.csv", &options).ip_report, None);
    }

    #[test]
    fn test_separate_outputs_reject_explicit_path() {
        let options = FlattenOptions {
            output: Some("out.csv".to_string()),
            ..Default::default()
        };
        let files = vec!["a.csv".to_string(), "b.csv".to_string()];
        let err = run(&files, &PipelineConfig::default(), &options).unwrap_err();
        assert!(err.to_string().contains("--merge"));
    }
}
