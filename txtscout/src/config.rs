use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};

/// Configuration for a search run.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.txtscout.yaml` in the current directory
/// 3. Global `$HOME/.config/txtscout/config.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// # Literal text to look for (case-sensitive, no regex)
/// pattern: "hello"
///
/// # Root directory to search in
/// root_path: "."
///
/// # File name suffixes to include
/// file_suffixes:
///   - ".txt"
///   - ".log"
///
/// # Patterns to ignore (glob syntax, relative to root_path)
/// ignore_patterns:
///   - "archive/**"
///
/// # Worker thread count (default: CPU cores)
/// thread_count: 4
///
/// # Grace period for workers to drain before they are interrupted
/// # (humantime syntax: "60s", "500ms", "2m")
/// shutdown_timeout: "60s"
///
/// # How to handle invalid UTF-8 (lossy, failfast)
/// encoding_mode: lossy
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// # CLI Integration
///
/// When using the CLI, command-line arguments take precedence over config file values.
/// Only flags the user actually passed are applied, see [`CliOverrides`] and
/// the `merge_with_cli` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The literal text to search for
    #[serde(default)]
    pub pattern: String,

    /// Root directory to start search from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// File name suffixes a file must end with to be searched
    #[serde(default = "default_file_suffixes")]
    pub file_suffixes: Vec<String>,

    /// Patterns to ignore (supports glob syntax)
    /// Examples:
    /// - "archive/**": Skip everything under archive/
    /// - "**/draft_*.txt": Skip drafts anywhere
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Honour .gitignore files and skip hidden entries
    #[serde(default)]
    pub respect_gitignore: bool,

    /// Visit directory entries in file-name order
    /// When false the filesystem listing order is used
    #[serde(default = "default_true")]
    pub sort_entries: bool,

    /// Whether to only show statistics instead of individual matches
    #[serde(default)]
    pub stats_only: bool,

    /// Number of worker threads in the pool
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Grace period for the pool to drain before running tasks are interrupted
    #[serde(default = "default_shutdown_timeout", with = "humantime_duration")]
    pub shutdown_timeout: Duration,

    /// How to handle invalid UTF-8 sequences
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Defines how to handle files that are not valid UTF-8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Report the file as a failed task on the first invalid line
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep scanning
    #[default]
    Lossy,
}

impl std::str::FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "failfast" => Ok(Self::FailFast),
            "lossy" => Ok(Self::Lossy),
            other => Err(SearchError::config_error(format!(
                "Unknown encoding mode '{}', expected failfast or lossy",
                other
            ))),
        }
    }
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_suffixes() -> Vec<String> {
    vec![".txt".to_string()]
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(60)
}

/// (De)serializes a `Duration` as a humantime string such as `"60s"` or `"500ms"`
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            root_path: default_root_path(),
            file_suffixes: default_file_suffixes(),
            ignore_patterns: Vec::new(),
            respect_gitignore: false,
            sort_entries: true,
            stats_only: false,
            thread_count: default_thread_count(),
            shutdown_timeout: default_shutdown_timeout(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for `pattern` under `root_path` with default settings
    pub fn new(pattern: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Default config locations
        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("txtscout/config.yaml")),
            // Local config
            Some(PathBuf::from(".txtscout.yaml")),
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

    /// Rejects configurations that cannot produce a meaningful search
    pub fn validate(&self) -> SearchResult<()> {
        if self.pattern.is_empty() {
            return Err(SearchError::config_error("Search string must not be empty"));
        }
        if self.file_suffixes.is_empty() || self.file_suffixes.iter().any(|s| s.is_empty()) {
            return Err(SearchError::config_error(
                "At least one non-empty file suffix is required",
            ));
        }
        Ok(())
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        // Positional arguments are always given on the command line
        self.pattern = cli.pattern;
        self.root_path = cli.root_path;

        // Flags only win when the user passed them
        if let Some(suffixes) = cli.file_suffixes {
            self.file_suffixes = suffixes;
        }
        if let Some(patterns) = cli.ignore_patterns {
            self.ignore_patterns = patterns;
        }
        if let Some(respect) = cli.respect_gitignore {
            self.respect_gitignore = respect;
        }
        if let Some(sort) = cli.sort_entries {
            self.sort_entries = sort;
        }
        if let Some(stats) = cli.stats_only {
            self.stats_only = stats;
        }
        if let Some(threads) = cli.thread_count {
            self.thread_count = threads;
        }
        if let Some(timeout) = cli.shutdown_timeout {
            self.shutdown_timeout = timeout;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }
}

/// Values taken from the command line.
///
/// `None` means the flag was not given and the configuration file (or the
/// built-in default) decides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub pattern: String,
    pub root_path: PathBuf,
    pub file_suffixes: Option<Vec<String>>,
    pub ignore_patterns: Option<Vec<String>>,
    pub respect_gitignore: Option<bool>,
    pub sort_entries: Option<bool>,
    pub stats_only: Option<bool>,
    pub thread_count: Option<NonZeroUsize>,
    pub shutdown_timeout: Option<Duration>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

impl CliOverrides {
    pub fn new(pattern: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            root_path: root_path.into(),
            ..Self::default()
        }
    }
}
