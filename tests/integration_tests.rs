/// Integration tests for the flatten and ip-report commands
/// These tests run whole exports through the commands and inspect the files written
use flate2::write::GzEncoder;
use flate2::Compression;
use m365_audit_tools::commands::flatten::{self, FlattenOptions};
use m365_audit_tools::commands::ip_report;
use m365_audit_tools::config::{PayloadColumn, PipelineConfig};
use m365_audit_tools::utils::table::IpReportFormat;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "CreationDate,UserIds,Operations,AuditData";

/// Export rows as they appear in a unified audit log CSV: payload cells are
/// CSV-quoted with doubled quotes
fn sample_rows() -> Vec<&'static str> {
    vec![
        r#"2024-01-02T10:00:00,alice@contoso.com,FileAccessed,"{""CreationTime"":""2024-01-02T10:00:00"",""ClientIP"":""10.0.0.1"",""Operation"":""FileAccessed"",""UserId"":""alice@contoso.com""}""#,
        r#"2024-01-01T09:00:00,bob@contoso.com,MailItemsAccessed,"{""CreationTime"":""2024-01-01T09:00:00"",""ClientIP"":""10.0.0.2"",""ClientIPAddress"":""10.0.0.1"",""Operation"":""MailItemsAccessed"",""Folders"":[{""Path"":""Inbox""}]}""#,
        "2024-01-03T08:00:00,carol@contoso.com,Unknown,{not valid json",
    ]
}

fn write_export(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    path
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn column(headers: &[String], name: &str) -> usize {
    headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("missing column {}", name))
}

fn quiet() -> FlattenOptions {
    FlattenOptions {
        quiet: true,
        ..Default::default()
    }
}

#[test]
fn test_flatten_writes_unified_table_and_report() {
    let dir = TempDir::new().unwrap();
    let input = write_export(dir.path(), "export.csv", &sample_rows());

    flatten::run(
        &[input.to_str().unwrap().to_string()],
        &PipelineConfig::default(),
        &quiet(),
    )
    .unwrap();

    let (headers, rows) = read_csv(&dir.path().join("export_processed.csv"));
    assert_eq!(
        headers,
        vec![
            "CreationTime",
            "IPAddresses",
            "Operation",
            "AffectedItems",
            "Item",
            "Folders",
            "ParseError",
            "RawPayload",
            "ClientIP",
            "ClientIPAddress",
            "Folders_0_Path",
            "UserId",
        ]
    );
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.len() == headers.len()));

    // Input order is kept
    assert_eq!(rows[0][column(&headers, "Operation")], "FileAccessed");
    assert_eq!(rows[0][column(&headers, "IPAddresses")], "10.0.0.1");
    assert_eq!(rows[0][column(&headers, "Folders_0_Path")], "");

    assert_eq!(rows[1][column(&headers, "IPAddresses")], "10.0.0.1, 10.0.0.2");
    assert_eq!(rows[1][column(&headers, "Folders_0_Path")], "Inbox");
    assert_eq!(rows[1][column(&headers, "ParseError")], "");

    // The unparseable row survives with its original text
    assert_eq!(rows[2][column(&headers, "ParseError")], "true");
    assert_eq!(rows[2][column(&headers, "RawPayload")], "{not valid json");
    assert_eq!(rows[2][column(&headers, "Operation")], "");

    let report = fs::read_to_string(dir.path().join("export_ip_report.txt")).unwrap();
    assert_eq!(
        report,
        "10.0.0.1 - 2 occurrences\n10.0.0.2 - 1 occurrences\n"
    );
}

#[test]
fn test_flatten_sort_by_time_puts_untimed_rows_last() {
    let dir = TempDir::new().unwrap();
    let input = write_export(dir.path(), "export.csv", &sample_rows());

    let options = FlattenOptions {
        sort_by_time: true,
        no_ip_report: true,
        ..quiet()
    };
    flatten::run(
        &[input.to_str().unwrap().to_string()],
        &PipelineConfig::default(),
        &options,
    )
    .unwrap();

    let (headers, rows) = read_csv(&dir.path().join("export_processed.csv"));
    let time = column(&headers, "CreationTime");
    assert_eq!(rows[0][time], "2024-01-01T09:00:00");
    assert_eq!(rows[1][time], "2024-01-02T10:00:00");
    assert_eq!(rows[2][column(&headers, "ParseError")], "true");

    assert!(!dir.path().join("export_ip_report.txt").exists());
}

#[test]
fn test_flatten_double_encoded_payload() {
    let dir = TempDir::new().unwrap();
    // After CSV decoding the payload still carries doubled quotes
    let input = write_export(
        dir.path(),
        "export.csv",
        &[r#"2024-01-02,dave@contoso.com,FileDeleted,"{""""Operation"""":""""FileDeleted"""",""""ClientIP"""":""""192.168.1.5"""",""""SiteUrl"""":""""https:\/\/contoso.sharepoint.com\/"""",}""#],
    );

    flatten::run(
        &[input.to_str().unwrap().to_string()],
        &PipelineConfig::default(),
        &quiet(),
    )
    .unwrap();

    let (headers, rows) = read_csv(&dir.path().join("export_processed.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column(&headers, "ParseError")], "");
    assert_eq!(rows[0][column(&headers, "Operation")], "FileDeleted");
    assert_eq!(
        rows[0][column(&headers, "SiteUrl")],
        "https://contoso.sharepoint.com/"
    );
}

#[test]
fn test_flatten_gzip_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.csv.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
    writeln!(encoder, "{}", HEADER).unwrap();
    for row in sample_rows() {
        writeln!(encoder, "{}", row).unwrap();
    }
    encoder.finish().unwrap();

    flatten::run(
        &[path.to_str().unwrap().to_string()],
        &PipelineConfig::default(),
        &quiet(),
    )
    .unwrap();

    let (_, rows) = read_csv(&dir.path().join("export_processed.csv"));
    assert_eq!(rows.len(), 3);
    assert!(dir.path().join("export_ip_report.txt").exists());
}

#[test]
fn test_flatten_merge_unions_columns_and_counts() {
    let dir = TempDir::new().unwrap();
    let rows = sample_rows();
    let first = write_export(dir.path(), "jan.csv", &rows[..1]);
    let second = write_export(
        dir.path(),
        "feb.csv",
        &[
            rows[1],
            r#"2024-02-01,erin@contoso.com,UserLoggedIn,"{""ClientIP"":""10.0.0.2"",""Operation"":""UserLoggedIn"",""ResultStatus"":""Success""}""#,
        ],
    );
    let merged = dir.path().join("out").join("merged.csv");

    let options = FlattenOptions {
        output: Some(merged.to_str().unwrap().to_string()),
        merge: true,
        ..quiet()
    };
    flatten::run(
        &[
            first.to_str().unwrap().to_string(),
            second.to_str().unwrap().to_string(),
        ],
        &PipelineConfig::default(),
        &options,
    )
    .unwrap();

    let (headers, rows) = read_csv(&merged);
    assert_eq!(rows.len(), 3);
    assert!(headers.contains(&"UserId".to_string()));
    assert!(headers.contains(&"ResultStatus".to_string()));
    assert!(headers.contains(&"Folders_0_Path".to_string()));
    assert_eq!(rows[0][column(&headers, "Operation")], "FileAccessed");
    assert_eq!(rows[2][column(&headers, "ResultStatus")], "Success");

    let report =
        fs::read_to_string(dir.path().join("out").join("merged_ip_report.txt")).unwrap();
    assert_eq!(
        report,
        "10.0.0.1 - 2 occurrences\n10.0.0.2 - 2 occurrences\n"
    );
}

#[test]
fn test_flatten_multiple_files_without_merge_writes_each() {
    let dir = TempDir::new().unwrap();
    let rows = sample_rows();
    let first = write_export(dir.path(), "jan.csv", &rows[..1]);
    let second = write_export(dir.path(), "feb.csv", &rows[1..]);

    flatten::run(
        &[
            first.to_str().unwrap().to_string(),
            second.to_str().unwrap().to_string(),
        ],
        &PipelineConfig::default(),
        &quiet(),
    )
    .unwrap();

    let (_, jan) = read_csv(&dir.path().join("jan_processed.csv"));
    let (_, feb) = read_csv(&dir.path().join("feb_processed.csv"));
    assert_eq!(jan.len(), 1);
    assert_eq!(feb.len(), 2);
}

#[test]
fn test_flatten_custom_payload_column_and_separator() {
    let dir = TempDir::new().unwrap();
    let input = write_export(dir.path(), "export.csv", &sample_rows()[1..2]);

    let config = PipelineConfig {
        payload_column: PayloadColumn::Index(3),
        separator: ".".to_string(),
        ..Default::default()
    };
    flatten::run(&[input.to_str().unwrap().to_string()], &config, &quiet()).unwrap();

    let (headers, rows) = read_csv(&dir.path().join("export_processed.csv"));
    assert_eq!(rows[0][column(&headers, "Folders.0.Path")], "Inbox");
}

#[test]
fn test_flatten_missing_payload_column() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.csv");
    fs::write(&path, "CreationDate,UserIds\n2024-01-01,alice\n").unwrap();

    let err = flatten::run(
        &[path.to_str().unwrap().to_string()],
        &PipelineConfig::default(),
        &quiet(),
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("AuditData"));
}

#[test]
fn test_flatten_nonexistent_file() {
    let err = flatten::run(
        &["/nonexistent/export.csv".to_string()],
        &PipelineConfig::default(),
        &quiet(),
    );
    assert!(err.is_err());
}

#[test]
fn test_ip_report_top_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write_export(dir.path(), "export.csv", &sample_rows());
    let output = dir.path().join("top.txt");

    ip_report::run(
        &[input.to_str().unwrap().to_string()],
        &PipelineConfig::default(),
        Some(output.to_str().unwrap()),
        IpReportFormat::Counts,
        Some(1),
    )
    .unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "10.0.0.1 - 2 occurrences\n"
    );
}

#[test]
fn test_ip_report_unique_format() {
    let dir = TempDir::new().unwrap();
    let input = write_export(dir.path(), "export.csv", &sample_rows());
    let output = dir.path().join("unique.txt");

    ip_report::run(
        &[input.to_str().unwrap().to_string()],
        &PipelineConfig::default(),
        Some(output.to_str().unwrap()),
        IpReportFormat::Unique,
        None,
    )
    .unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "10.0.0.1\n10.0.0.2\n");
}
