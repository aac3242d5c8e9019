//! Ensure, delete, and list flows for session daemons.

use std::fs;
use std::io;
use std::time::{Duration, SystemTime};

use wb_config::{Config, SessionName, SessionPaths};

use super::error::LifecycleError;
use super::monitoring::wait_for_ready;
use super::shutdown::{ShutdownTimings, recorded_pid, signal_daemon, wait_for_shutdown};
use super::socket::socket_is_reachable;
use super::spawning::{DaemonLaunch, spawn_daemon};
use super::types::{LifecycleContext, SessionStatus};
use super::utils::{open_dir, open_log};
use crate::connector::Connector;

/// Production lifecycle controller.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemLifecycle;

impl SystemLifecycle {
    /// Makes sure a daemon serves `session`, starting one when needed.
    ///
    /// A socket file nobody listens on is left over from a crashed daemon and
    /// is removed before the new daemon starts.
    pub(crate) fn ensure_session(
        self,
        context: LifecycleContext<'_>,
        session: &SessionName,
        debug: bool,
    ) -> Result<SessionPaths, LifecycleError> {
        let paths = context.config.session_paths(session);
        if paths.socket_path().exists() {
            if socket_is_reachable(paths.socket_path())? {
                return Ok(paths);
            }
            remove_stale_socket(&paths)?;
        }
        paths.prepare()?;
        let log = open_log(&paths)?;
        let launch = DaemonLaunch {
            config_arguments: context.config_arguments,
            binary_override: context.daemon_binary,
            session,
            debug,
        };
        let started_at = SystemTime::now();
        let mut child = spawn_daemon(&launch, log)?;
        wait_for_ready(
            &paths,
            session,
            &mut child,
            started_at,
            context.config.startup_timeout(),
        )?;
        Ok(paths)
    }

    /// Deletes `session`: the daemon acknowledges and exits, a lingering
    /// daemon is sent `SIGTERM`, and the session directory is removed.
    pub(crate) fn delete_session(
        self,
        context: LifecycleContext<'_>,
        session: &SessionName,
    ) -> Result<(), LifecycleError> {
        self.delete_session_within(context, session, ShutdownTimings::default())
    }

    /// [`Self::delete_session`] with explicit deadlines.
    ///
    /// A daemon that never acknowledges is treated like one that acknowledged
    /// but did not exit.
    pub(crate) fn delete_session_within(
        self,
        context: LifecycleContext<'_>,
        session: &SessionName,
        timings: ShutdownTimings,
    ) -> Result<(), LifecycleError> {
        let paths = context.config.session_paths(session);
        if !paths.session_dir().exists() {
            return Err(LifecycleError::UnknownSession {
                session: session.clone(),
            });
        }
        if socket_is_reachable(paths.socket_path())? {
            request_deletion(&paths, context.config.request_timeout(), timings)?;
        }
        match wait_for_shutdown(&paths, timings.grace) {
            Ok(()) => {}
            Err(LifecycleError::ShutdownTimeout { .. }) => {
                if let Some(pid) = recorded_pid(&paths)? {
                    signal_daemon(pid)?;
                }
                wait_for_shutdown(&paths, timings.terminate)?;
            }
            Err(error) => return Err(error),
        }
        remove_session_dir(&paths)
    }

    /// Sessions with a directory under the sessions root, sorted by name.
    pub(crate) fn list_sessions(self, config: &Config) -> Result<Vec<SessionStatus>, LifecycleError> {
        let root = config.sessions_dir().as_std_path();
        if !root.exists() {
            return Ok(Vec::new());
        }
        let list_error = |source| LifecycleError::ListSessions {
            path: root.to_path_buf(),
            source,
        };
        let dir = open_dir(root)?;
        let mut sessions = Vec::new();
        for entry in dir.entries().map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            if !entry.file_type().map_err(list_error)?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().to_string_lossy().parse::<SessionName>() else {
                continue;
            };
            let paths = config.session_paths(&name);
            let is_running = matches!(socket_is_reachable(paths.socket_path()), Ok(true));
            sessions.push(SessionStatus {
                name: name.to_string(),
                is_running,
            });
        }
        sessions.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(sessions)
    }
}

/// Sends `deleteSession`. Only an explicit refusal from the daemon is an
/// error; a daemon that vanished or stayed silent is left to the shutdown wait.
fn request_deletion(
    paths: &SessionPaths,
    request_timeout: Duration,
    timings: ShutdownTimings,
) -> Result<(), LifecycleError> {
    let outcome = Connector::connect(paths.socket_path(), request_timeout)
        .and_then(|connector| connector.delete_session(timings.ack));
    match outcome {
        Ok(()) => Ok(()),
        Err(error) if error.is_daemon_not_running() || error.is_unanswered() => Ok(()),
        Err(error) => Err(error.into()),
    }
}

fn remove_stale_socket(paths: &SessionPaths) -> Result<(), LifecycleError> {
    match fs::remove_file(paths.socket_path()) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LifecycleError::RemoveStaleSocket {
            path: paths.socket_path().to_path_buf(),
            source,
        }),
    }
}

fn remove_session_dir(paths: &SessionPaths) -> Result<(), LifecycleError> {
    match fs::remove_dir_all(paths.session_dir()) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LifecycleError::RemoveSession {
            path: paths.session_dir().to_path_buf(),
            source,
        }),
    }
}
