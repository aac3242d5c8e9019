//! Error types for session lifecycle operations.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use thiserror::Error;
use wb_config::{SessionName, SessionPathsError};

use super::monitoring::DaemonStatus;
use crate::connector::ConnectorError;

/// Errors raised while starting, inspecting, or deleting sessions.
#[derive(Debug, Error)]
pub(crate) enum LifecycleError {
    #[error(transparent)]
    Paths(#[from] SessionPathsError),
    #[error("failed to check session socket {path:?}: {source}")]
    SocketCheck {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove stale session socket {path:?}: {source}")]
    RemoveStaleSocket {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open daemon log {path:?}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn wbd binary '{binary:?}': {source}")]
    LaunchDaemon {
        binary: OsString,
        #[source]
        source: io::Error,
    },
    #[error("failed to monitor daemon launch: {source}")]
    MonitorChild {
        #[source]
        source: io::Error,
    },
    #[error(
        "daemon for session '{session}' exited before reporting ready (status: {exit_status:?}){}",
        log_excerpt(.log_tail)
    )]
    StartupFailed {
        session: SessionName,
        exit_status: Option<i32>,
        log_tail: String,
    },
    #[error(
        "daemon for session '{session}' reported '{status}' before reaching ready{}",
        log_excerpt(.log_tail)
    )]
    StartupAborted {
        session: SessionName,
        status: DaemonStatus,
        log_tail: String,
    },
    #[error(
        "timed out after {timeout_ms} ms waiting for session '{session}' to start{}",
        log_excerpt(.log_tail)
    )]
    SpawnTimeout {
        session: SessionName,
        timeout_ms: u128,
        log_tail: String,
    },
    #[error("failed to open directory {path:?}: {source}")]
    OpenDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read health snapshot {path:?}: {source}")]
    ReadHealth {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse health snapshot {path:?}: {source}")]
    ParseHealth {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read pid file {path:?}: {source}")]
    ReadPid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse pid file {path:?}: {source}")]
    ParsePid {
        path: PathBuf,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("system clock reports {time:?}, before the Unix epoch")]
    InvalidSystemClock { time: SystemTime },
    #[error("failed to signal daemon pid {pid}: {source}")]
    SignalFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("daemon shutdown did not complete within {timeout_ms} ms; check {pid_path:?}")]
    ShutdownTimeout { pid_path: PathBuf, timeout_ms: u128 },
    #[error("session '{session}' does not exist")]
    UnknownSession { session: SessionName },
    #[error("failed to remove session directory {path:?}: {source}")]
    RemoveSession {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list sessions in {path:?}: {source}")]
    ListSessions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

impl LifecycleError {
    /// Whether starting the daemon again might succeed.
    pub(crate) const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LaunchDaemon { .. } | Self::StartupFailed { .. } | Self::StartupAborted { .. }
        )
    }
}

fn log_excerpt(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!("\ndaemon log:\n{tail}")
    }
}
