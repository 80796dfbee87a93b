//! Batch driver for the record normalization pipeline.
//!
//! Each payload goes through sanitize → parse → IP extraction → flatten →
//! order, and the result is accumulated into a [`Batch`] together with the
//! schema observations and the IP aggregate. `IPAddresses`, `ParseError` and
//! `RawPayload` always come from the pipeline, never from payload keys.
//!
//! A payload that fails to parse still produces a row (error flag set, raw
//! text preserved), so no input row is ever dropped.
//!
//! Batches built independently (for example one per input file, on separate
//! threads) can be combined with [`Batch::merge`]; column order is only fixed
//! by [`Batch::finish`], after all contributions are in.

use super::flatten::Flattener;
use super::ip::{IpAggregate, IpExtractor};
use super::parser::PayloadParser;
use super::sanitizer::Sanitizer;
use super::schema::{RecordOrderer, SchemaError, SchemaUnifier};
use super::types::{CanonicalRecord, FlatRecord, ParseOutcome, RawRow};
use crate::config::{PipelineConfig, IP_ADDRESSES_FIELD, PARSE_ERROR_FIELD, RAW_PAYLOAD_FIELD};
use crate::utils::format::{format_number, percentage};

/// A row whose payload could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDiagnostic {
    pub row: usize,
    pub message: String,
}

/// Row counters for a batch
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub failed_rows: usize,
    pub diagnostics: Vec<RowDiagnostic>,
}

impl BatchStats {
    fn merge(&mut self, other: BatchStats) {
        self.total_rows += other.total_rows;
        self.parsed_rows += other.parsed_rows;
        self.failed_rows += other.failed_rows;
        self.diagnostics.extend(other.diagnostics);
    }

    /// Print a summary of processing statistics
    pub fn report(&self) {
        eprintln!("\nProcessing Summary:");
        eprintln!("  Rows read: {}", format_number(self.total_rows));
        eprintln!("  Parsed payloads: {}", format_number(self.parsed_rows));
        if self.failed_rows > 0 {
            eprintln!(
                "  Unparseable payloads: {} ({:.2}%)",
                format_number(self.failed_rows),
                percentage(self.failed_rows, self.total_rows)
            );
        }
    }
}

/// Records, schema observations and IP counts accumulated from some rows
#[derive(Debug, Clone)]
pub struct Batch {
    records: Vec<CanonicalRecord>,
    schema: SchemaUnifier,
    ips: IpAggregate,
    stats: BatchStats,
}

impl Batch {
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn ip_aggregate(&self) -> &IpAggregate {
        &self.ips
    }

    /// Append another batch's rows after this one's
    pub fn merge(&mut self, other: Batch) -> Result<(), SchemaError> {
        self.schema.merge(other.schema)?;
        self.records.extend(other.records);
        self.ips.merge(other.ips);
        self.stats.merge(other.stats);
        Ok(())
    }

    /// Fix the column order and hand out the finished output
    pub fn finish(mut self) -> BatchOutput {
        let columns = self.schema.finalize().to_vec();
        BatchOutput {
            columns,
            records: self.records,
            ips: self.ips,
            stats: self.stats,
        }
    }
}

/// A finished batch: final columns plus everything needed to write it
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub columns: Vec<String>,
    pub records: Vec<CanonicalRecord>,
    pub ips: IpAggregate,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Records laid out against the final columns
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.records.iter().map(|record| record.to_row(&self.columns))
    }
}

/// The configured chain of pipeline components
#[derive(Debug, Clone)]
pub struct Pipeline {
    parser: PayloadParser,
    flattener: Flattener,
    extractor: IpExtractor,
    orderer: RecordOrderer,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            parser: PayloadParser::new(Sanitizer::new(config.quote_convention)),
            flattener: Flattener::new(config.separator.clone()),
            extractor: IpExtractor::new(config.ip_fields.clone(), config.ip_delimiter.clone()),
            orderer: RecordOrderer::new(config.lead_fields.clone()),
        }
    }

    /// Empty batch with this pipeline's lead fields
    pub fn new_batch(&self) -> Batch {
        Batch {
            records: Vec::new(),
            schema: SchemaUnifier::new(self.orderer.lead_fields().to_vec()),
            ips: IpAggregate::new(),
            stats: BatchStats::default(),
        }
    }

    /// Normalize one payload into `batch`.
    ///
    /// Returns the diagnostic when the payload could not be parsed.
    pub fn process_payload<'b>(
        &self,
        batch: &'b mut Batch,
        payload: &str,
        row: usize,
    ) -> Option<&'b RowDiagnostic> {
        batch.stats.total_rows += 1;
        let mut failed = false;

        let flat = match self.parser.parse(payload, row) {
            ParseOutcome::Success(record) => {
                batch.stats.parsed_rows += 1;
                let ips = self.extractor.extract(&record);
                batch.ips.record(&ips);

                // Reserved fields are set here, never taken from the payload
                let mut flat = self.flattener.flatten(&record);
                flat.insert(IP_ADDRESSES_FIELD.to_string(), self.extractor.join(&ips));
                flat.remove(PARSE_ERROR_FIELD);
                flat.remove(RAW_PAYLOAD_FIELD);
                flat
            }
            ParseOutcome::Failure { reason, raw } => {
                failed = true;
                batch.stats.failed_rows += 1;
                batch.stats.diagnostics.push(RowDiagnostic {
                    row,
                    message: reason.to_string(),
                });
                let mut flat = FlatRecord::new();
                flat.insert(PARSE_ERROR_FIELD.to_string(), "true".to_string());
                flat.insert(RAW_PAYLOAD_FIELD.to_string(), raw);
                flat
            }
        };

        let record = self.orderer.order(flat);
        // The schema is only finalized by `Batch::finish`, which consumes the batch.
        let observed = batch.schema.observe(&record);
        debug_assert!(observed.is_ok(), "batch schema finalized early");
        batch.records.push(record);

        if failed {
            batch.stats.diagnostics.last()
        } else {
            None
        }
    }

    /// Normalize one source row whose payload sits at `payload_index`
    pub fn process_row<'b>(
        &self,
        batch: &'b mut Batch,
        row: &RawRow,
        payload_index: usize,
    ) -> Option<&'b RowDiagnostic> {
        let payload = row.get_index(payload_index).unwrap_or("");
        self.process_payload(batch, payload, row.line)
    }

    /// Run a whole sequence of rows through the pipeline
    pub fn process_rows<I>(&self, rows: I, payload_index: usize) -> Batch
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut batch = self.new_batch();
        for row in rows {
            self.process_row(&mut batch, &row, payload_index);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_record() {
        let pipeline = Pipeline::default();
        let mut batch = pipeline.new_batch();
        let diagnostic = pipeline.process_payload(
            &mut batch,
            r#"{"CreationTime":"2024-01-01T00:00:00Z","ClientIP":"10.0.0.1","Operation":"FileAccessed","Item":{"Name":"a.txt"}}"#,
            2,
        );
        assert!(diagnostic.is_none());

        let output = batch.finish();
        let record = &output.records[0];
        assert_eq!(record.get("CreationTime"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(record.get("IPAddresses"), Some("10.0.0.1"));
        assert_eq!(record.get("Operation"), Some("FileAccessed"));
        assert_eq!(record.get("Item_Name"), Some("a.txt"));
        assert_eq!(record.get("ParseError"), Some(""));
        assert_eq!(output.ips.ranked(), vec![("10.0.0.1", 1)]);
    }

    #[test]
    fn test_failed_row_retained() {
        let pipeline = Pipeline::default();
        let mut batch = pipeline.new_batch();

        let diagnostic = pipeline
            .process_payload(&mut batch, "{not valid json", 2)
            .cloned()
            .expect("diagnostic for bad row");
        assert_eq!(diagnostic.row, 2);
        assert!(diagnostic.message.contains("row 2"));

        assert!(pipeline
            .process_payload(&mut batch, r#"{"Operation":"Send"}"#, 3)
            .is_none());

        let output = batch.finish();
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.stats.failed_rows, 1);
        assert_eq!(output.stats.parsed_rows, 1);

        let failed = &output.records[0];
        assert_eq!(failed.get("ParseError"), Some("true"));
        assert_eq!(failed.get("RawPayload"), Some("{not valid json"));
        assert_eq!(failed.get("Operation"), Some(""));
        assert_eq!(failed.get("IPAddresses"), Some(""));
        assert_eq!(output.records[1].get("Operation"), Some("Send"));
    }

    #[test]
    fn test_payload_cannot_set_reserved_fields() {
        let pipeline = Pipeline::default();
        let mut batch = pipeline.new_batch();

        let diagnostic = pipeline.process_payload(
            &mut batch,
            r#"{"ParseError":"true","RawPayload":"x","IPAddresses":"6.6.6.6","Operation":"Send"}"#,
            2,
        );
        assert!(diagnostic.is_none());

        let output = batch.finish();
        let record = &output.records[0];
        assert_eq!(record.get("ParseError"), Some(""));
        assert_eq!(record.get("RawPayload"), Some(""));
        assert_eq!(record.get("IPAddresses"), Some(""));
        assert_eq!(record.get("Operation"), Some("Send"));
        assert_eq!(output.stats.failed_rows, 0);
        assert!(output.ips.is_empty());
    }

    #[test]
    fn test_ip_counts_across_records() {
        let pipeline = Pipeline::default();
        let mut batch = pipeline.new_batch();
        pipeline.process_payload(&mut batch, r#"{"ClientIP":"192.168.1.1"}"#, 2);
        pipeline.process_payload(
            &mut batch,
            r#"{"ClientIP":"192.168.1.1","ClientIPAddress":"10.0.0.5"}"#,
            3,
        );

        let output = batch.finish();
        assert_eq!(
            output.ips.report_lines(),
            vec!["192.168.1.1 - 2 occurrences", "10.0.0.5 - 1 occurrences"]
        );
        assert_eq!(
            output.records[1].get("IPAddresses"),
            Some("10.0.0.5, 192.168.1.1")
        );
    }

    #[test]
    fn test_rows_fill_missing_columns() {
        let pipeline = Pipeline::default();
        let rows = vec![
            RawRow::new(2, vec![("AuditData".into(), r#"{"Workload":"Exchange"}"#.into())]),
            RawRow::new(3, vec![("AuditData".into(), r#"{"UserId":"alice"}"#.into())]),
        ];

        let output = pipeline.process_rows(rows, 0).finish();
        let workload = output.columns.iter().position(|c| c == "Workload").unwrap();
        let user = output.columns.iter().position(|c| c == "UserId").unwrap();
        let rows: Vec<Vec<String>> = output.rows().collect();

        assert_eq!(rows[0][workload], "Exchange");
        assert_eq!(rows[0][user], "");
        assert_eq!(rows[1][workload], "");
        assert_eq!(rows[1][user], "alice");
        assert!(rows.iter().all(|r| r.len() == output.columns.len()));
    }

    #[test]
    fn test_merge_batches() {
        let pipeline = Pipeline::default();
        let mut first = pipeline.new_batch();
        pipeline.process_payload(&mut first, r#"{"ClientIP":"10.0.0.1","A":1}"#, 2);
        let mut second = pipeline.new_batch();
        pipeline.process_payload(&mut second, r#"{"ClientIP":"10.0.0.1","B":2}"#, 2);

        first.merge(second).unwrap();
        let output = first.finish();

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.ips.count("10.0.0.1"), 2);
        assert!(output.columns.contains(&"A".to_string()));
        assert!(output.columns.contains(&"B".to_string()));
        assert_eq!(output.stats.total_rows, 2);
    }
}
