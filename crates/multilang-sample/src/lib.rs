//! Sample record processor host for the multilang daemon.
//!
//! [`SampleProcessor`] logs every lifecycle callback and checkpoints the
//! newest sequence number it has seen. [`run`] hosts it on stdin/stdout with
//! logs kept off stdout.

mod processor;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use multilang_config::{LoggingArgs, telemetry};
use multilang_protocol::Engine;
use tracing::{error, info};

pub use self::processor::SampleProcessor;

const SAMPLE_TARGET: &str = "multilang_sample";

/// Hosts the sample record processor on stdin and stdout.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "multilang-sample", version)]
pub struct Cli {
    #[command(flatten)]
    logging: LoggingArgs,
}

impl Cli {
    /// Logging options.
    #[must_use]
    pub const fn logging(&self) -> &LoggingArgs {
        &self.logging
    }
}

/// Parses `args`, then runs one protocol session over stdin and stdout.
///
/// Diagnostics go to a dispatch scoped to the session so nothing else in the
/// process can route them onto stdout. Argument and telemetry failures are
/// written to `stderr`.
pub fn run<I, T>(args: I, stderr: &mut dyn Write) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(parse_error) => {
            let code = if parse_error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            drop(parse_error.print());
            return code;
        }
    };

    let dispatch = match telemetry::dispatch(cli.logging()) {
        Ok(dispatch) => dispatch,
        Err(telemetry_error) => {
            writeln!(stderr, "{telemetry_error}").ok();
            return ExitCode::FAILURE;
        }
    };

    let result = Engine::stdio(SampleProcessor::new())
        .with_log_dispatch(dispatch.clone())
        .run();

    tracing::dispatcher::with_default(&dispatch, || match result {
        Ok(()) => {
            info!(target: SAMPLE_TARGET, "record processor exited");
            ExitCode::SUCCESS
        }
        Err(protocol_error) => {
            error!(target: SAMPLE_TARGET, error = %protocol_error, "record processor failed");
            ExitCode::FAILURE
        }
    })
}
