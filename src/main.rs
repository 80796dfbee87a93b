use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use m365_audit_tools::audit::sanitizer::QuoteConvention;
use m365_audit_tools::commands;
use m365_audit_tools::commands::flatten::FlattenOptions;
use m365_audit_tools::config::{ConfigOverrides, PayloadColumn, PipelineConfig};
use m365_audit_tools::utils::table::IpReportFormat;

#[derive(Parser)]
#[command(name = "m365-audit")]
#[command(about = "Microsoft 365 audit log export normalization tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Pipeline settings shared by every processing command
#[derive(Args)]
struct PipelineArgs {
    /// JSON config file (flags below override its values)
    #[arg(long)]
    config: Option<String>,

    /// Column holding the JSON payload: header name or zero-based index [default: AuditData]
    #[arg(long)]
    payload_column: Option<PayloadColumn>,

    /// Columns emitted first, in order (comma-separated)
    #[arg(long, value_delimiter = ',')]
    lead_fields: Option<Vec<String>>,

    /// Separator joining nested key paths [default: _]
    #[arg(long)]
    separator: Option<String>,

    /// Fields holding client IPs (comma-separated; "/a/b" is a JSON pointer)
    #[arg(long, value_delimiter = ',')]
    ip_fields: Option<Vec<String>>,

    /// How quotes are escaped in the payload column [default: auto]
    #[arg(long, value_enum)]
    quote_convention: Option<QuoteConvention>,
}

impl PipelineArgs {
    fn resolve(self) -> Result<PipelineConfig> {
        ConfigOverrides {
            payload_column: self.payload_column,
            lead_fields: self.lead_fields,
            separator: self.separator,
            ip_fields: self.ip_fields,
            quote_convention: self.quote_convention,
        }
        .resolve(self.config.as_deref())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten audit log exports into a schema-unified CSV and an IP report
    Flatten {
        /// Path to export CSV file(s) - plain, .gz or .zst
        #[arg(required = true)]
        input_files: Vec<String>,

        /// Output CSV file path [default: <input>_processed.csv]
        #[arg(short, long)]
        output: Option<String>,

        /// IP report file path [default: next to the output]
        #[arg(long)]
        ip_report: Option<String>,

        /// IP report format
        #[arg(long, value_enum, default_value = "counts")]
        ip_format: IpReportFormat,

        /// Skip writing the IP report
        #[arg(long, conflicts_with = "ip_report")]
        no_ip_report: bool,

        /// Merge all input files into a single output
        #[arg(long)]
        merge: bool,

        /// Sort output rows by CreationTime
        #[arg(long)]
        sort_by_time: bool,

        /// Suppress progress bars and per-row warnings
        #[arg(short, long)]
        quiet: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Report client IP addresses by number of records they appear in
    IpReport {
        /// Path to export CSV file(s) - plain, .gz or .zst
        #[arg(required = true)]
        input_files: Vec<String>,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Report format
        #[arg(long, value_enum, default_value = "counts")]
        format: IpReportFormat,

        /// Only report the N most frequent addresses
        #[arg(long)]
        top: Option<usize>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flatten {
            input_files,
            output,
            ip_report,
            ip_format,
            no_ip_report,
            merge,
            sort_by_time,
            quiet,
            pipeline,
        } => {
            let config = pipeline.resolve()?;
            let options = FlattenOptions {
                output,
                ip_report,
                ip_format,
                no_ip_report,
                merge,
                sort_by_time,
                quiet,
            };
            commands::flatten::run(&input_files, &config, &options)
        }
        Commands::IpReport {
            input_files,
            output,
            format,
            top,
            pipeline,
        } => {
            let config = pipeline.resolve()?;
            commands::ip_report::run(&input_files, &config, output.as_deref(), format, top)
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "m365-audit", &mut std::io::stdout());
            Ok(())
        }
    }
}
