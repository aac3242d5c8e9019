use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTimeError;

use nix::errno::Errno;
use ortho_config::OrthoError;
use thiserror::Error;
use wb_config::SessionPathsError;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::daemonizer::DaemonizeError;
use super::shutdown::ShutdownError;

/// Everything that can stop `wbd` from serving its session.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Loader error.
        #[from]
        source: Arc<OrthoError>,
    },
    /// The session directory could not be prepared.
    #[error(transparent)]
    SessionPaths(#[from] SessionPathsError),
    /// The session lock could not be taken.
    #[error("failed to take session lock {path:?}: {source}")]
    LockCreate {
        /// Lock file path.
        path: PathBuf,
        /// IO error.
        #[source]
        source: io::Error,
    },
    /// A live daemon already serves this session.
    #[error("session is already served by wbd pid {pid}")]
    AlreadyRunning {
        /// PID recorded by the live daemon.
        pid: u32,
    },
    /// A lock, pid, or health file left by a dead daemon could not be removed.
    #[error("failed to remove leftover {path:?}: {source}")]
    Cleanup {
        /// Leftover file.
        path: PathBuf,
        /// IO error.
        #[source]
        source: io::Error,
    },
    /// The pid file could not be written.
    #[error("failed to record pid in {path:?}: {source}")]
    PidWrite {
        /// PID file path.
        path: PathBuf,
        /// IO error.
        #[source]
        source: io::Error,
    },
    /// The health snapshot could not be written.
    #[error("failed to publish health snapshot {path:?}: {source}")]
    HealthWrite {
        /// Health file path.
        path: PathBuf,
        /// IO error.
        #[source]
        source: io::Error,
    },
    /// The health snapshot could not be encoded.
    #[error("failed to encode health snapshot: {source}")]
    HealthSerialise {
        /// Encoder error.
        #[from]
        source: serde_json::Error,
    },
    /// Health was published before the pid file existed.
    #[error("health snapshot requested before the pid file was written")]
    MissingPid,
    /// The clock reads earlier than the Unix epoch.
    #[error("system clock is before the Unix epoch: {source}")]
    Clock {
        /// Clock error.
        #[source]
        source: SystemTimeError,
    },
    /// Probing the pid recorded by a previous daemon failed.
    #[error("failed to check previous wbd pid {pid}: {source}")]
    CheckProcess {
        /// Checked PID.
        pid: u32,
        /// OS error.
        #[source]
        source: Errno,
    },
    /// Detaching into the background failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Daemoniser error.
        #[from]
        source: DaemonizeError,
    },
    /// Signal handling could not be installed or waited on.
    #[error("shutdown handling failed: {source}")]
    Shutdown {
        /// Signal handling error.
        #[from]
        source: ShutdownError,
    },
    /// Configuration, telemetry, or engine startup failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Bootstrap error.
        #[from]
        source: BootstrapError,
    },
    /// The actor thread that owns the session could not be started.
    #[error("failed to start session actor: {source}")]
    SessionThread {
        /// IO error.
        #[source]
        source: io::Error,
    },
    /// The session socket could not be served.
    #[error("session socket failed: {source}")]
    Listener {
        /// Listener error.
        #[from]
        source: ListenerError,
    },
}
