//! Failures binding or running the session socket listener.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Inspecting an existing file at the socket path failed.
    #[error("failed to inspect session socket {path:?}: {source}")]
    Inspect {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Something other than a socket occupies the socket path.
    #[error("{path:?} exists and is not a socket; refusing to replace it")]
    NotSocket {
        /// Socket path.
        path: PathBuf,
    },
    /// Another daemon already serves the session.
    #[error("session socket {path:?} is served by another daemon")]
    InUse {
        /// Socket path.
        path: PathBuf,
    },
    /// Checking an existing socket failed for a reason other than refusal.
    #[error("failed to check existing session socket {path:?}: {source}")]
    CheckExisting {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stale socket could not be removed.
    #[error("failed to remove stale session socket {path:?}: {source}")]
    RemoveStale {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Binding the socket failed.
    #[error("failed to bind session socket {path:?}: {source}")]
    Bind {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept loop needs a non-blocking listener.
    #[error("failed to make the session socket non-blocking: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("failed to spawn the accept thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("accept thread panicked")]
    ThreadPanic,
}
