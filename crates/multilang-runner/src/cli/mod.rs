//! Command-line interface for the daemon launcher.

use std::path::{Path, PathBuf};

use clap::Parser;
use multilang_config::LoggingArgs;


/// Environment variable consulted when `--java` is absent.
pub const JAVA_ENV: &str = "JAVA";

/// Environment variable consulted when `--properties` is absent.
pub const PROPERTIES_ENV: &str = "PROPERTIES";

/// Environment variable consulted when `--jar` is absent.
pub const JAR_ENV: &str = "JAR";

/// Launches the multilang daemon with a record processor properties file.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "multilang-runner", version)]
pub struct Cli {
    /// Path to the java executable, e.g. `<jdk>/bin/java`.
    #[arg(long, env = JAVA_ENV, value_name = "PATH")]
    java: PathBuf,
    /// Path to the daemon properties file.
    #[arg(long, env = PROPERTIES_ENV, value_name = "PATH")]
    properties: PathBuf,
    /// Folder holding the daemon's jar dependencies.
    #[arg(long, env = JAR_ENV, value_name = "DIR")]
    jar: PathBuf,
    #[command(flatten)]
    logging: LoggingArgs,
}

impl Cli {
    /// Java executable.
    #[must_use]
    pub fn java(&self) -> &Path {
        &self.java
    }

    /// Daemon properties file.
    #[must_use]
    pub fn properties(&self) -> &Path {
        &self.properties
    }

    /// Jar dependency folder.
    #[must_use]
    pub fn jar(&self) -> &Path {
        &self.jar
    }

    /// Logging options.
    #[must_use]
    pub const fn logging(&self) -> &LoggingArgs {
        &self.logging
    }
}
