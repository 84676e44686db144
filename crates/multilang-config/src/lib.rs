//! Shared configuration for the multilang runner and processor binaries.
//!
//! Both binaries accept the same logging flags, each with an environment
//! fallback, and build their tracing subscribers through [`telemetry`].

mod defaults;
mod logging;
pub mod telemetry;

pub use defaults::{
    DEFAULT_LOG_FILTER, LOG_FILE_ENV, LOG_FILTER_ENV, LOG_FORMAT_ENV, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError, LoggingArgs};
pub use telemetry::{TelemetryError, TelemetryHandle};
