use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{ScanError, ScanResult};
use crate::extract::{ExtractLimits, DEFAULT_MAX_PAGES};

/// Tunables for a scan run.
///
/// # Configuration Locations
///
/// Loaded from, in increasing order of precedence:
/// 1. Global `$HOME/.config/docscout/config.yaml`
/// 2. Local `.docscout.yaml` in the current directory
/// 3. A file passed with `--config`
///
/// # Configuration Format
///
/// ```yaml
/// # Files scanned at the same time
/// concurrency: 4
///
/// # Abandon a single file after this long
/// per_file_timeout_ms: 30000
///
/// # Size guards, in bytes
/// max_tabular_bytes: 52428800
/// max_page_text_bytes: 104857600
///
/// # PDF pages scanned per document
/// max_pages: 500
///
/// # Failure messages kept in the run summary
/// failure_report_limit: 20
///
/// include_subfolders: true
/// ignore_patterns:
///   - "**/archive/**"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// Command-line values override file values, see [`ScanConfig::merge_with_cli`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of files dispatched per batch
    #[serde(default = "default_concurrency")]
    pub concurrency: NonZeroUsize,

    /// Deadline for scanning a single file, in milliseconds
    #[serde(default = "default_per_file_timeout_ms")]
    pub per_file_timeout_ms: u64,

    /// Workbooks larger than this are rejected without being parsed
    #[serde(default = "default_max_tabular_bytes")]
    pub max_tabular_bytes: u64,

    /// PDFs larger than this are rejected without being parsed
    #[serde(default = "default_max_page_text_bytes")]
    pub max_page_text_bytes: u64,

    /// Pages scanned per PDF; later pages are ignored
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Failure messages kept in the run summary
    #[serde(default = "default_failure_report_limit")]
    pub failure_report_limit: usize,

    /// Whether directory walks descend into subfolders
    #[serde(default = "default_include_subfolders")]
    pub include_subfolders: bool,

    /// Glob patterns for paths that are never selected
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_concurrency() -> NonZeroUsize {
    NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN)
}

fn default_per_file_timeout_ms() -> u64 {
    30_000
}

fn default_max_tabular_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_max_page_text_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_failure_report_limit() -> usize {
    20
}

fn default_include_subfolders() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            per_file_timeout_ms: default_per_file_timeout_ms(),
            max_tabular_bytes: default_max_tabular_bytes(),
            max_page_text_bytes: default_max_page_text_bytes(),
            max_pages: default_max_pages(),
            failure_report_limit: default_failure_report_limit(),
            include_subfolders: default_include_subfolders(),
            ignore_patterns: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub concurrency: Option<NonZeroUsize>,
    pub per_file_timeout_ms: Option<u64>,
    pub max_pages: Option<usize>,
    pub include_subfolders: Option<bool>,
    pub ignore_patterns: Vec<String>,
    pub log_level: Option<String>,
}

impl ScanConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, layering an optional explicit file on top of
    /// the global and local files
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("docscout/config.yaml")),
            Some(PathBuf::from(".docscout.yaml")),
        ];
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Applies command-line values over the loaded configuration
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(timeout) = cli.per_file_timeout_ms {
            self.per_file_timeout_ms = timeout;
        }
        if let Some(max_pages) = cli.max_pages {
            self.max_pages = max_pages;
        }
        if let Some(include_subfolders) = cli.include_subfolders {
            self.include_subfolders = include_subfolders;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Rejects settings no run could work with
    pub fn validate(&self) -> ScanResult<()> {
        if self.per_file_timeout_ms == 0 {
            return Err(ScanError::config_error(
                "per_file_timeout_ms must be greater than zero",
            ));
        }
        if self.max_pages == 0 {
            return Err(ScanError::config_error("max_pages must be greater than zero"));
        }
        Ok(())
    }

    pub fn per_file_timeout(&self) -> Duration {
        Duration::from_millis(self.per_file_timeout_ms)
    }

    pub fn extract_limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_pages: self.max_pages,
        }
    }
}
