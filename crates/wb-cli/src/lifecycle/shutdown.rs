//! Waiting for a daemon to stop, and stopping it when it will not.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use libc::{ESRCH, SIGTERM, kill};
use wb_config::SessionPaths;

use super::error::LifecycleError;
use super::monitoring::read_pid;
use super::socket::socket_is_reachable;
use super::utils::open_session_dir;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Deadlines for deleting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShutdownTimings {
    /// Wait for the daemon to acknowledge `deleteSession`.
    pub ack: Duration,
    /// Wait for the daemon to exit on its own.
    pub grace: Duration,
    /// Wait for the daemon to exit after `SIGTERM`.
    pub terminate: Duration,
}

impl Default for ShutdownTimings {
    fn default() -> Self {
        Self {
            ack: Duration::from_secs(5),
            grace: Duration::from_secs(5),
            terminate: Duration::from_secs(10),
        }
    }
}

/// Polls until the socket is unreachable and no live process holds the PID
/// file.
pub(super) fn wait_for_shutdown(
    paths: &SessionPaths,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let deadline = Instant::now() + timeout;
    loop {
        if !socket_is_reachable(paths.socket_path())? && !daemon_process_lingers(paths)? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(LifecycleError::ShutdownTimeout {
                pid_path: paths.pid_path().to_path_buf(),
                timeout_ms: timeout.as_millis(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// The PID recorded for the session, if any.
pub(super) fn recorded_pid(paths: &SessionPaths) -> Result<Option<u32>, LifecycleError> {
    if !paths.session_dir().exists() {
        return Ok(None);
    }
    let dir = open_session_dir(paths)?;
    read_pid(&dir, paths)
}

fn daemon_process_lingers(paths: &SessionPaths) -> Result<bool, LifecycleError> {
    Ok(recorded_pid(paths)?.is_some_and(process_is_alive))
}

/// Whether a process with `pid` exists.
pub(super) fn process_is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: `kill(2)` with signal 0 only checks for the process; an invalid
    // PID yields an error rather than undefined behaviour.
    let result = unsafe { kill(pid, 0) };
    result == 0 || io::Error::last_os_error().raw_os_error() != Some(ESRCH)
}

/// Sends `SIGTERM` to the daemon. A process that has already exited is not an
/// error.
pub(super) fn signal_daemon(pid: u32) -> Result<(), LifecycleError> {
    let target = libc::pid_t::try_from(pid).map_err(|_| LifecycleError::SignalFailed {
        pid,
        source: io::Error::from(io::ErrorKind::InvalidInput),
    })?;
    // SAFETY: `kill(2)` is memory-safe even when the PID is invalid; the
    // kernel simply returns an error.
    let result = unsafe { kill(target, SIGTERM) };
    if result == 0 {
        return Ok(());
    }
    let source = io::Error::last_os_error();
    if source.raw_os_error() == Some(ESRCH) {
        return Ok(());
    }
    Err(LifecycleError::SignalFailed { pid, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::net::UnixListener;
    use std::process::Command;

    use rstest::rstest;
    use tempfile::TempDir;
    use wb_config::SessionName;

    fn paths(root: &TempDir) -> SessionPaths {
        let paths = SessionPaths::new(root.path(), &SessionName::default());
        paths.prepare().expect("prepare");
        paths
    }

    fn exited_pid() -> u32 {
        let mut child = Command::new("true").spawn().expect("spawn");
        let pid = child.id();
        child.wait().expect("reap");
        pid
    }

    #[rstest]
    fn quiet_session_is_already_shut_down() {
        let root = TempDir::new().expect("temp dir");
        wait_for_shutdown(&paths(&root), Duration::from_millis(100)).expect("stopped");
    }

    #[rstest]
    fn pid_file_of_an_exited_process_does_not_block() {
        let root = TempDir::new().expect("temp dir");
        let paths = paths(&root);
        fs::write(paths.pid_path(), exited_pid().to_string()).expect("pid");

        wait_for_shutdown(&paths, Duration::from_millis(100)).expect("stopped");
    }

    #[rstest]
    fn live_socket_times_out() {
        let root = TempDir::new().expect("temp dir");
        let paths = paths(&root);
        let _listener = UnixListener::bind(paths.socket_path()).expect("bind");

        let error = wait_for_shutdown(&paths, Duration::from_millis(200)).expect_err("timeout");

        assert!(matches!(error, LifecycleError::ShutdownTimeout { .. }));
    }

    #[rstest]
    fn current_process_is_alive() {
        assert!(process_is_alive(std::process::id()));
    }

    #[rstest]
    fn signalling_an_exited_process_succeeds() {
        signal_daemon(exited_pid()).expect("already gone");
    }

    #[rstest]
    fn signal_terminates_a_running_process() {
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn");

        signal_daemon(child.id()).expect("signal");

        let status = child.wait().expect("wait");
        assert!(!status.success());
    }
}
