//! Launching and supervising the JVM daemon.
//!
//! The daemon's stdout and stderr are drained on scoped threads and each line
//! is re-emitted as a tracing event while the calling thread waits for exit.

use std::env;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;

use strum::Display;
use tracing::{debug, info};

use crate::classpath;
use crate::error::RunnerError;


/// Main class of the supervising daemon.
pub const DAEMON_CLASS: &str = "software.amazon.kinesis.multilang.MultiLangDaemon";

/// Tracing target for forwarded daemon output and lifecycle events.
pub const DAEMON_TARGET: &str = "multilang_runner::daemon";

/// One of the daemon's piped output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OutputStream {
    /// The daemon's standard output.
    Stdout,
    /// The daemon's standard error.
    Stderr,
}

/// A fully resolved daemon invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonCommand {
    java: PathBuf,
    properties: PathBuf,
    classpath: OsString,
}

impl DaemonCommand {
    /// Creates a command from already validated parts.
    #[must_use]
    pub const fn new(java: PathBuf, properties: PathBuf, classpath: OsString) -> Self {
        Self {
            java,
            properties,
            classpath,
        }
    }

    /// Validates the properties file and builds the classpath from
    /// `jar_folder` plus the current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::MissingProperties`] when `properties` is not a
    /// file, [`RunnerError::WorkingDirectory`] when the working directory
    /// cannot be resolved, and any classpath error.
    pub fn resolve(java: &Path, properties: &Path, jar_folder: &Path) -> Result<Self, RunnerError> {
        if !properties.is_file() {
            return Err(RunnerError::MissingProperties {
                path: properties.to_path_buf(),
            });
        }
        let working_dir = env::current_dir().map_err(|source| RunnerError::WorkingDirectory {
            source: Arc::new(source),
        })?;
        let classpath = classpath::build(jar_folder, &working_dir)?;
        Ok(Self::new(
            java.to_path_buf(),
            properties.to_path_buf(),
            classpath,
        ))
    }

    /// Java executable that will be started.
    #[must_use]
    pub fn java(&self) -> &Path {
        &self.java
    }

    /// Arguments passed to the java executable.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-cp"),
            self.classpath.clone(),
            OsString::from(DAEMON_CLASS),
            self.properties.clone().into_os_string(),
        ]
    }

    /// Starts the daemon, forwards its output to the log, and waits for it
    /// to exit.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the process cannot be started or awaited,
    /// when output forwarding fails, or when the daemon exits unsuccessfully.
    pub fn run(&self) -> Result<(), RunnerError> {
        let mut child = Command::new(&self.java)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.java.clone(),
                source: Arc::new(source),
            })?;

        info!(
            target: DAEMON_TARGET,
            pid = child.id(),
            java = %self.java.display(),
            properties = %self.properties.display(),
            "started daemon"
        );

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            (stdout, _) => {
                drop(child.kill());
                drop(child.wait());
                let stream = if stdout.is_none() {
                    OutputStream::Stdout
                } else {
                    OutputStream::Stderr
                };
                return Err(RunnerError::PipeCapture { stream });
            }
        };

        let (status, forwarded) = thread::scope(|scope| {
            let out = scope.spawn(|| pipe_to_log(stdout, OutputStream::Stdout));
            let err = scope.spawn(|| pipe_to_log(stderr, OutputStream::Stderr));
            let status = child.wait();
            let forwarded = [
                joined(out.join(), OutputStream::Stdout),
                joined(err.join(), OutputStream::Stderr),
            ];
            (status, forwarded)
        });

        let status = status.map_err(|source| RunnerError::Wait {
            source: Arc::new(source),
        })?;
        check_exit(status)?;
        for result in forwarded {
            result?;
        }
        Ok(())
    }
}

fn joined(
    result: thread::Result<Result<usize, RunnerError>>,
    stream: OutputStream,
) -> Result<usize, RunnerError> {
    result.unwrap_or(Err(RunnerError::Forward {
        stream,
        source: None,
    }))
}

fn check_exit(status: ExitStatus) -> Result<(), RunnerError> {
    info!(target: DAEMON_TARGET, %status, "daemon exited");
    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::NonZeroExit {
            code: status.code(),
        })
    }
}

/// Re-emits every line read from `reader` as an info event tagged with
/// `stream`, returning the number of lines forwarded.
///
/// Invalid UTF-8 is replaced rather than rejected. A final line without a
/// trailing newline is still forwarded.
///
/// # Errors
///
/// Returns [`RunnerError::Forward`] when reading fails.
pub fn pipe_to_log(reader: impl Read, stream: OutputStream) -> Result<usize, RunnerError> {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let mut forwarded = 0;
    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .map_err(|source| RunnerError::Forward {
                stream,
                source: Some(Arc::new(source)),
            })?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buffer);
        info!(
            target: DAEMON_TARGET,
            %stream,
            "{}",
            line.trim_end_matches(['\r', '\n'])
        );
        forwarded += 1;
    }
    debug!(target: DAEMON_TARGET, %stream, lines = forwarded, "daemon stream closed");
    Ok(forwarded)
}
