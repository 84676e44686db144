//! Logging options shared by the runner and processor binaries.
//!
//! Processor hosts speak the protocol on stdout, so log output goes to
//! stderr unless a log file is configured.

use std::path::{Path, PathBuf};

use clap::Args;
use strum::{Display, EnumString};

use crate::defaults::{
    DEFAULT_LOG_FILTER, LOG_FILE_ENV, LOG_FILTER_ENV, LOG_FORMAT_ENV, default_log_format,
};

/// Supported logging output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Command-line and environment options controlling log output.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct LoggingArgs {
    /// Tracing filter expression, e.g. `info` or `multilang_protocol=debug`.
    #[arg(long = "log-filter", env = LOG_FILTER_ENV, default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log output format: `json` or `compact`.
    #[arg(long = "log-format", env = LOG_FORMAT_ENV, default_value_t = default_log_format())]
    log_format: LogFormat,

    /// Append logs to this file instead of stderr.
    #[arg(long = "log-file", env = LOG_FILE_ENV)]
    log_file: Option<PathBuf>,
}

impl Default for LoggingArgs {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            log_file: None,
        }
    }
}

impl LoggingArgs {
    /// Replaces the filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Replaces the output format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Sends logs to `path` instead of stderr.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Filter expression handed to the subscriber.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Optional log file path.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
