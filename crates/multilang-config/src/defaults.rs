//! Default values shared by the binaries.

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable consulted when `--log-filter` is absent.
pub const LOG_FILTER_ENV: &str = "MULTILANG_LOG_FILTER";

/// Environment variable consulted when `--log-format` is absent.
pub const LOG_FORMAT_ENV: &str = "MULTILANG_LOG_FORMAT";

/// Environment variable consulted when `--log-file` is absent.
pub const LOG_FILE_ENV: &str = "MULTILANG_LOG_FILE";

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
