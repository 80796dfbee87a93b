//! Delimited-text input and output.
//!
//! [`TableReader`] yields [`RawRow`]s from a CSV export (plain or
//! compressed), tolerating a UTF-8 byte-order mark, ragged rows and invalid
//! UTF-8. The writers lay a finished batch out against its final columns and
//! render the IP aggregate report. Quoting follows standard CSV rules, so
//! values containing commas, quotes or newlines round-trip exactly.

use crate::audit::ip::IpAggregate;
use crate::audit::pipeline::BatchOutput;
use crate::audit::types::RawRow;
use crate::utils::reader::open_file;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

const BOM: char = '\u{feff}';

/// Row-by-row reader over a CSV table with a header row
pub struct TableReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: csv::ByteRecord,
}

impl TableReader<Box<dyn Read + Send>> {
    /// Open a table file, decompressing `.gz` / `.zst` transparently
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_file(path)?;
        Self::from_reader(reader)
            .with_context(|| format!("Failed to read header row of {}", path.display()))
    }
}

impl<R: Read> TableReader<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .byte_headers()
            .context("Failed to read header row")?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let header = String::from_utf8_lossy(h);
                if i == 0 {
                    header.trim_start_matches(BOM).to_string()
                } else {
                    header.into_owned()
                }
            })
            .collect();

        Ok(Self {
            reader,
            headers,
            record: csv::ByteRecord::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Bytes consumed so far, for progress reporting
    pub fn bytes_read(&self) -> u64 {
        self.reader.position().byte()
    }

    /// Read the next data row, or `None` at end of input
    pub fn next_row(&mut self) -> Result<Option<RawRow>> {
        let more = self
            .reader
            .read_byte_record(&mut self.record)
            .with_context(|| format!("Failed to read row after line {}", self.reader.position().line()))?;
        if !more {
            return Ok(None);
        }

        let line = self
            .record
            .position()
            .map_or(0, |p| p.line() as usize);

        let cells = self
            .record
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let name = self
                    .headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", i));
                (name, String::from_utf8_lossy(value).into_owned())
            })
            .collect();

        Ok(Some(RawRow::new(line, cells)))
    }
}

/// Shape of the IP aggregate artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IpReportFormat {
    /// `<ip> - <count> occurrences`, most frequent first
    #[default]
    Counts,
    /// One distinct address per line, sorted
    Unique,
}

/// Write the finished batch as CSV: final columns as header, one row per record
pub fn write_table<W: Write>(writer: W, output: &BatchOutput) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer
        .write_record(&output.columns)
        .context("Failed to write header row")?;
    for row in output.rows() {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_table_file(path: impl AsRef<Path>, output: &BatchOutput) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    write_table(BufWriter::new(file), output)
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

/// Write the IP aggregate, optionally limited to the first `top` entries
pub fn write_ip_report<W: Write>(
    mut writer: W,
    ips: &IpAggregate,
    format: IpReportFormat,
    top: Option<usize>,
) -> Result<()> {
    let lines: Vec<String> = match format {
        IpReportFormat::Counts => ips.report_lines(),
        IpReportFormat::Unique => ips.unique().into_iter().map(str::to_string).collect(),
    };
    let limit = top.unwrap_or(lines.len());

    for line in lines.iter().take(limit) {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_ip_report_file(
    path: impl AsRef<Path>,
    ips: &IpAggregate,
    format: IpReportFormat,
    top: Option<usize>,
) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create IP report: {}", path.display()))?;
    write_ip_report(BufWriter::new(file), ips, format, top)
        .with_context(|| format!("Failed to write IP report: {}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}
