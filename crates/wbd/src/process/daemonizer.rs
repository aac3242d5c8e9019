//! Implements the daemonisation backend for the `wbd` process.

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use daemonize_me::Daemon;
use thiserror::Error;
use tracing::info;
use wb_config::SessionPaths;

use super::PROCESS_TARGET;

/// Abstraction over daemonisation strategies.
pub trait Daemonizer: Send + Sync {
    /// Detaches the process into the background.
    fn daemonize(&self, paths: &SessionPaths) -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// System-level daemonisation failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
    /// The log file receiving the daemon's output could not be opened.
    #[error("failed to open daemon log '{path}': {source}")]
    Log {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Daemoniser that delegates to `daemonize-me`.
#[derive(Debug, Default)]
pub struct SystemDaemonizer;

impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Daemonizer for SystemDaemonizer {
    fn daemonize(&self, paths: &SessionPaths) -> Result<(), DaemonizeError> {
        info!(
            target: PROCESS_TARGET,
            session = %paths.session_dir().display(),
            log = %paths.log_path().display(),
            "daemonising into background"
        );
        let stdout = open_log(paths)?;
        let stderr = stdout.try_clone().map_err(|source| DaemonizeError::Log {
            path: paths.log_path().to_path_buf(),
            source,
        })?;
        Daemon::new()
            .work_dir(paths.session_dir())
            .stdout(stdout)
            .stderr(stderr)
            .name(OsStr::new(env!("CARGO_PKG_NAME")))
            .start()?;
        info!(
            target: PROCESS_TARGET,
            "daemon process detached; continuing in child"
        );
        Ok(())
    }
}

fn open_log(paths: &SessionPaths) -> Result<File, DaemonizeError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(paths.log_path())
        .map_err(|source| DaemonizeError::Log {
            path: paths.log_path().to_path_buf(),
            source,
        })
}
