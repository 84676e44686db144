//! Error types for launching the supervising daemon.

use std::env::JoinPathsError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::daemon::OutputStream;


/// Errors raised while preparing, starting, or supervising the daemon.
#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    /// The jar folder could not be listed.
    #[error("failed to read jar folder '{}': {source}", .path.display())]
    JarFolder {
        /// Folder that was listed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The jar folder exists but holds no entries.
    #[error("jar folder '{}' is empty", .path.display())]
    EmptyJarFolder {
        /// Folder that was listed.
        path: PathBuf,
    },

    /// The daemon properties file does not exist.
    #[error("properties file '{}' does not exist", .path.display())]
    MissingProperties {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The current working directory could not be resolved.
    #[error("failed to resolve the working directory: {source}")]
    WorkingDirectory {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A classpath entry contains the platform path separator.
    #[error("failed to join classpath entries: {source}")]
    Classpath {
        /// Underlying join error.
        #[source]
        source: Arc<JoinPathsError>,
    },

    /// The java executable could not be started.
    #[error("failed to start '{}': {source}", .program.display())]
    Spawn {
        /// Program that was executed.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A piped output stream was not available on the child handle.
    #[error("failed to capture daemon {stream}")]
    PipeCapture {
        /// Stream that was missing.
        stream: OutputStream,
    },

    /// Forwarding daemon output into the log failed part way.
    #[error("failed to forward daemon {stream}")]
    Forward {
        /// Stream being forwarded.
        stream: OutputStream,
        /// Read error, absent when the forwarding thread panicked.
        #[source]
        source: Option<Arc<io::Error>>,
    },

    /// Waiting for the daemon to exit failed.
    #[error("failed waiting for the daemon: {source}")]
    Wait {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The daemon exited unsuccessfully.
    #[error("daemon exited with {}", display_exit(*.code))]
    NonZeroExit {
        /// Exit code, absent when the daemon was killed by a signal.
        code: Option<i32>,
    },
}

fn display_exit(code: Option<i32>) -> String {
    code.map_or_else(
        || String::from("no exit code (terminated by signal)"),
        |code| format!("status {code}"),
    )
}
