//! Readiness monitoring for a freshly spawned daemon.
//!
//! The daemon reports its state through `wbd.health`. The client polls that
//! snapshot together with the launched process and the session socket until
//! the daemon is ready, fails, or the startup timeout expires.

use std::fmt;
use std::process::Child;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use cap_std::fs::Dir;
use serde::Deserialize;
use wb_config::{SessionName, SessionPaths};

use super::error::LifecycleError;
use super::socket::socket_is_reachable;
use super::utils::{log_tail, open_session_dir, read_optional};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// State the daemon writes into its health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DaemonStatus {
    Starting,
    Ready,
    Stopping,
    Failed,
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        })
    }
}

/// Contents of `wbd.health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct HealthSnapshot {
    pub status: DaemonStatus,
    pub pid: u32,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HealthCheckOutcome {
    Ready,
    Aborted(DaemonStatus),
    Continue,
}

/// What is known about the launched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaunchState {
    Running,
    /// Exited successfully after handing over to a forked daemon.
    Daemonized,
    /// Exited unsuccessfully, typically because another daemon owns the session.
    Exited(Option<i32>),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessMonitorContext {
    pub started_at: SystemTime,
    pub expected_pid: u32,
    pub daemonized: bool,
}

/// Waits until the daemon launched as `child` serves `session`.
///
/// A launch that exits unsuccessfully still counts as ready when the socket
/// is reachable, since a concurrent client may have started the daemon first.
pub(super) fn wait_for_ready(
    paths: &SessionPaths,
    session: &SessionName,
    child: &mut Child,
    started_at: SystemTime,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let dir = open_session_dir(paths)?;
    let deadline = Instant::now() + timeout;
    let expected_pid = child.id();
    let mut launch = LaunchState::Running;
    loop {
        if launch == LaunchState::Running
            && let Some(status) = child
                .try_wait()
                .map_err(|source| LifecycleError::MonitorChild { source })?
        {
            launch = if status.success() {
                LaunchState::Daemonized
            } else {
                LaunchState::Exited(status.code())
            };
        }

        if let LaunchState::Exited(exit_status) = launch {
            if socket_is_reachable(paths.socket_path())? {
                return Ok(());
            }
            if !another_daemon_is_live(&dir, paths, expected_pid)? {
                return Err(LifecycleError::StartupFailed {
                    session: session.clone(),
                    exit_status,
                    log_tail: log_tail(paths),
                });
            }
        } else {
            let monitor = ProcessMonitorContext {
                started_at,
                expected_pid,
                daemonized: launch == LaunchState::Daemonized,
            };
            match check_health_snapshot(&dir, paths, monitor)? {
                HealthCheckOutcome::Ready => return Ok(()),
                HealthCheckOutcome::Aborted(status) => {
                    return Err(LifecycleError::StartupAborted {
                        session: session.clone(),
                        status,
                        log_tail: log_tail(paths),
                    });
                }
                HealthCheckOutcome::Continue => {}
            }
        }

        if Instant::now() >= deadline {
            return Err(LifecycleError::SpawnTimeout {
                session: session.clone(),
                timeout_ms: timeout.as_millis(),
                log_tail: log_tail(paths),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Evaluates the health snapshot for this launch.
pub(crate) fn check_health_snapshot(
    dir: &Dir,
    paths: &SessionPaths,
    monitor: ProcessMonitorContext,
) -> Result<HealthCheckOutcome, LifecycleError> {
    let Some(snapshot) = read_health(dir, paths)? else {
        return Ok(HealthCheckOutcome::Continue);
    };
    let pid_ok = monitor.daemonized || snapshot.pid == monitor.expected_pid;
    if !pid_ok || !snapshot_is_recent(&snapshot, monitor.started_at)? {
        return Ok(HealthCheckOutcome::Continue);
    }
    match snapshot.status {
        DaemonStatus::Ready => {
            if socket_is_reachable(paths.socket_path())? {
                Ok(HealthCheckOutcome::Ready)
            } else {
                Ok(HealthCheckOutcome::Continue)
            }
        }
        DaemonStatus::Starting => Ok(HealthCheckOutcome::Continue),
        status @ (DaemonStatus::Stopping | DaemonStatus::Failed) => {
            Ok(HealthCheckOutcome::Aborted(status))
        }
    }
}

fn another_daemon_is_live(
    dir: &Dir,
    paths: &SessionPaths,
    launched_pid: u32,
) -> Result<bool, LifecycleError> {
    Ok(read_health(dir, paths)?.is_some_and(|snapshot| {
        snapshot.pid != launched_pid
            && matches!(snapshot.status, DaemonStatus::Starting | DaemonStatus::Ready)
    }))
}

/// Reads `wbd.health`; `None` while the daemon has not written it yet.
pub(crate) fn read_health(
    dir: &Dir,
    paths: &SessionPaths,
) -> Result<Option<HealthSnapshot>, LifecycleError> {
    let path = paths.health_path();
    let Some(content) = read_optional(dir, path).map_err(|source| LifecycleError::ReadHealth {
        path: path.to_path_buf(),
        source,
    })?
    else {
        return Ok(None);
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| LifecycleError::ParseHealth {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads `wbd.pid`; `None` when absent or empty.
pub(crate) fn read_pid(dir: &Dir, paths: &SessionPaths) -> Result<Option<u32>, LifecycleError> {
    let path = paths.pid_path();
    let Some(content) = read_optional(dir, path).map_err(|source| LifecycleError::ReadPid {
        path: path.to_path_buf(),
        source,
    })?
    else {
        return Ok(None);
    };
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|source| LifecycleError::ParsePid {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn snapshot_is_recent(
    snapshot: &HealthSnapshot,
    started_at: SystemTime,
) -> Result<bool, LifecycleError> {
    // Snapshot timestamps have whole-second precision.
    let started_secs = started_at
        .duration_since(UNIX_EPOCH)
        .map_err(|_| LifecycleError::InvalidSystemClock { time: started_at })?
        .as_secs();
    Ok(snapshot.timestamp >= started_secs)
}
