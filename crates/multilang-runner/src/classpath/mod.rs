//! Classpath assembly for the daemon's JVM.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::RunnerError;


const CLASSPATH_TARGET: &str = "multilang_runner::classpath";

/// Lists every entry of `jar_folder` as an absolute path, sorted by name.
///
/// # Errors
///
/// Returns [`RunnerError::JarFolder`] when the folder cannot be read and
/// [`RunnerError::EmptyJarFolder`] when it has no entries.
pub fn jar_paths(jar_folder: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    let folder_error = |source| RunnerError::JarFolder {
        path: jar_folder.to_path_buf(),
        source: Arc::new(source),
    };

    let mut paths = fs::read_dir(jar_folder)
        .map_err(folder_error)?
        .map(|entry| entry.and_then(|found| std::path::absolute(found.path())))
        .collect::<Result<Vec<_>, _>>()
        .map_err(folder_error)?;

    if paths.is_empty() {
        return Err(RunnerError::EmptyJarFolder {
            path: jar_folder.to_path_buf(),
        });
    }
    paths.sort();
    Ok(paths)
}

/// Builds the classpath: the jars in `jar_folder` followed by `working_dir`,
/// joined with the platform separator.
///
/// # Errors
///
/// Propagates [`jar_paths`] failures and returns [`RunnerError::Classpath`]
/// when an entry contains the separator itself.
pub fn build(jar_folder: &Path, working_dir: &Path) -> Result<OsString, RunnerError> {
    let mut entries = jar_paths(jar_folder)?;
    entries.push(working_dir.to_path_buf());
    debug!(
        target: CLASSPATH_TARGET,
        entries = entries.len(),
        "assembled classpath"
    );
    env::join_paths(entries).map_err(|source| RunnerError::Classpath {
        source: Arc::new(source),
    })
}
