//! Pipeline configuration.
//!
//! Every knob of the normalization pipeline lives in [`PipelineConfig`].
//! Values come from built-in defaults, optionally overlaid by a JSON config
//! file, and finally by explicit command-line flags.
//!
//! ```json
//! {
//!   "payload_column": "AuditData",
//!   "lead_fields": ["CreationTime", "IPAddresses", "Operation", "UserId"],
//!   "separator": ".",
//!   "ip_fields": ["ClientIP", "ClientIPAddress", "/ActorInfo/IP"],
//!   "quote_convention": "doubled-quotes"
//! }
//! ```

use crate::audit::sanitizer::QuoteConvention;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Timestamp field used for chronological sorting
pub const CREATION_TIME_FIELD: &str = "CreationTime";
/// Name of the field holding the consolidated IP list
pub const IP_ADDRESSES_FIELD: &str = "IPAddresses";
/// Name of the field flagging rows whose payload failed to parse
pub const PARSE_ERROR_FIELD: &str = "ParseError";
/// Name of the field preserving the payload text of failed rows
pub const RAW_PAYLOAD_FIELD: &str = "RawPayload";

pub const DEFAULT_LEAD_FIELDS: &[&str] = &[
    CREATION_TIME_FIELD,
    IP_ADDRESSES_FIELD,
    "Operation",
    "AffectedItems",
    "Item",
    "Folders",
    PARSE_ERROR_FIELD,
    RAW_PAYLOAD_FIELD,
];

pub const DEFAULT_IP_FIELDS: &[&str] = &["ClientIP", "ClientIPAddress"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("payload column '{name}' not found in header (columns: {available})")]
    ColumnNotFound { name: String, available: String },

    #[error("payload column index {index} out of range (table has {width} columns)")]
    ColumnOutOfRange { index: usize, width: usize },

    #[error("lead field '{0}' listed more than once")]
    DuplicateLeadField(String),

    #[error("flattening separator must not be empty")]
    EmptySeparator,

    #[error("flattening separator '{0}' must not contain a backslash")]
    SeparatorContainsEscape(String),

    #[error("IP address delimiter must not be empty")]
    EmptyIpDelimiter,
}

/// Which source column holds the JSON payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PayloadColumn {
    /// Zero-based column position
    Index(usize),
    /// Header name
    Name(String),
}

impl Default for PayloadColumn {
    fn default() -> Self {
        Self::Name("AuditData".to_string())
    }
}

impl FromStr for PayloadColumn {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<usize>()
            .map_or_else(|_| Self::Name(s.to_string()), Self::Index))
    }
}

impl fmt::Display for PayloadColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{}", index),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

impl PayloadColumn {
    /// Resolve to a zero-based position within `headers`
    pub fn resolve(&self, headers: &[String]) -> Result<usize, ConfigError> {
        match self {
            Self::Index(index) if *index < headers.len() => Ok(*index),
            Self::Index(index) => Err(ConfigError::ColumnOutOfRange {
                index: *index,
                width: headers.len(),
            }),
            Self::Name(name) => headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ConfigError::ColumnNotFound {
                    name: name.clone(),
                    available: headers.join(", "),
                }),
        }
    }
}

/// Settings for one normalization run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub payload_column: PayloadColumn,
    /// Columns always emitted first, in this order
    pub lead_fields: Vec<String>,
    /// Joins key path segments of nested fields
    pub separator: String,
    /// Fields holding client IPs; a leading `/` makes it a JSON pointer
    pub ip_fields: Vec<String>,
    /// Joins the consolidated IP set in the `IPAddresses` field
    pub ip_delimiter: String,
    pub quote_convention: QuoteConvention,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            payload_column: PayloadColumn::default(),
            lead_fields: DEFAULT_LEAD_FIELDS.iter().map(|s| s.to_string()).collect(),
            separator: "_".to_string(),
            ip_fields: DEFAULT_IP_FIELDS.iter().map(|s| s.to_string()).collect(),
            ip_delimiter: ", ".to_string(),
            quote_convention: QuoteConvention::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        if self.separator.contains('\\') {
            return Err(ConfigError::SeparatorContainsEscape(self.separator.clone()));
        }
        if self.ip_delimiter.is_empty() {
            return Err(ConfigError::EmptyIpDelimiter);
        }
        for (i, field) in self.lead_fields.iter().enumerate() {
            if self.lead_fields[..i].contains(field) {
                return Err(ConfigError::DuplicateLeadField(field.clone()));
            }
        }
        Ok(())
    }
}

/// Command-line overrides applied on top of a base config
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub payload_column: Option<PayloadColumn>,
    pub lead_fields: Option<Vec<String>>,
    pub separator: Option<String>,
    pub ip_fields: Option<Vec<String>>,
    pub quote_convention: Option<QuoteConvention>,
}

impl ConfigOverrides {
    /// Build the effective config: defaults, then `config_file`, then overrides
    pub fn resolve(self, config_file: Option<&str>) -> Result<PipelineConfig> {
        let mut config = match config_file {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(column) = self.payload_column {
            config.payload_column = column;
        }
        if let Some(fields) = self.lead_fields {
            config.lead_fields = fields;
        }
        if let Some(separator) = self.separator {
            config.separator = separator;
        }
        if let Some(fields) = self.ip_fields {
            config.ip_fields = fields;
        }
        if let Some(convention) = self.quote_convention {
            config.quote_convention = convention;
        }

        config.validate()?;
        Ok(config)
    }
}
