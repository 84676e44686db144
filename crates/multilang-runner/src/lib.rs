//! Launcher for the multilang supervising daemon.
//!
//! The runner builds a JVM classpath from a folder of jars plus the working
//! directory, starts the daemon with a properties file naming the record
//! processor executable, and forwards the daemon's output into structured
//! logs until it exits.

pub mod classpath;
pub mod cli;
pub mod daemon;
pub mod error;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use multilang_config::telemetry;
use tracing::error;

pub use self::cli::Cli;
pub use self::daemon::{DAEMON_CLASS, DaemonCommand, OutputStream, pipe_to_log};
pub use self::error::RunnerError;

const RUNNER_TARGET: &str = "multilang_runner";

/// Resolves and runs the daemon described by `cli`.
///
/// # Errors
///
/// Returns [`RunnerError`] when the invocation cannot be resolved, the daemon
/// cannot be started, or it exits unsuccessfully.
pub fn launch(cli: &Cli) -> Result<(), RunnerError> {
    DaemonCommand::resolve(cli.java(), cli.properties(), cli.jar())?.run()
}

/// Parses `args`, installs telemetry, and runs the daemon to completion.
///
/// Argument and telemetry failures are written to `stderr`. Runner failures
/// are logged once telemetry is available.
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

    if let Err(telemetry_error) = telemetry::initialise(cli.logging()) {
        writeln!(stderr, "{telemetry_error}").ok();
        return ExitCode::FAILURE;
    }

    match launch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(runner_error) => {
            error!(target: RUNNER_TARGET, error = %runner_error, "runner failed");
            ExitCode::FAILURE
        }
    }
}
