use serde::Deserialize;

/// Main configuration structure for Baltic-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    pub identifiers: IdentifierConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub output: OutputConfig,
}

/// Run behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Maximum number of extractions in flight at once
    #[serde(rename = "concurrency-limit")]
    pub concurrency_limit: u32,

    /// Minimum time between dispatch grants (milliseconds)
    #[serde(rename = "min-interval-ms", default)]
    pub min_interval_ms: u64,

    /// Maximum delivery attempts per identifier
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// How the identifier set is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierMode {
    /// Enumerate a contiguous IMO range
    Range,
    /// Use an explicit list of IMO numbers
    List,
    /// Read IMO numbers from a file of vessel URLs
    UrlFile,
}

/// Identifier set configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifierConfig {
    pub mode: IdentifierMode,

    /// First IMO number (inclusive, range mode)
    #[serde(rename = "start-imo")]
    pub start_imo: Option<u64>,

    /// Last IMO number (inclusive, range mode)
    #[serde(rename = "end-imo")]
    pub end_imo: Option<u64>,

    /// Explicit IMO numbers (list mode)
    pub list: Option<Vec<u64>>,

    /// Path to a vessel URL listing (url-file mode)
    #[serde(rename = "url-file")]
    pub url_file: Option<String>,

    /// Drop candidates that fail the IMO check digit before dispatch
    #[serde(rename = "validate-checksum", default = "default_true")]
    pub validate_checksum: bool,
}

/// Remote source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the vessel database
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite checkpoint database
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Directory for per-vessel JSON records
    #[serde(rename = "records-dir")]
    pub records_dir: String,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://www.balticshipping.com".to_string()
}
