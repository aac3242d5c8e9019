//! Derives the per-session filesystem layout shared by the CLI and daemon.
//!
//! Every session lives in its own directory under the configured sessions
//! root. The directory holds the daemon socket, the browser profile, and the
//! supervisor artefacts (lock, pid, health, log). Deleting a session removes
//! the whole directory so no stale liveness hint survives it.

use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION_NAME: &str = "default";

/// Longest socket path accepted by `sockaddr_un` on common platforms.
const MAX_SOCKET_PATH_BYTES: usize = 104;

/// Validated session identifier, safe to use as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionName(String);

impl SessionName {
    /// Borrows the name as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionName {
    fn default() -> Self {
        Self(DEFAULT_SESSION_NAME.to_owned())
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for SessionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionName {
    type Err = SessionNameError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(SessionNameError::Empty);
        }
        if input.starts_with('.') {
            return Err(SessionNameError::LeadingDot {
                name: input.to_owned(),
            });
        }
        if let Some(character) = input
            .chars()
            .find(|character| matches!(character, '/' | '\\' | '\0') || character.is_control())
        {
            return Err(SessionNameError::InvalidCharacter {
                name: input.to_owned(),
                character,
            });
        }
        Ok(Self(input.to_owned()))
    }
}

/// Errors raised while validating a session name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionNameError {
    /// The name was empty.
    #[error("session name must not be empty")]
    Empty,
    /// The name would produce a hidden or relative directory.
    #[error("session name '{name}' must not start with '.'")]
    LeadingDot {
        /// Rejected name.
        name: String,
    },
    /// The name contained a path separator or control character.
    #[error("session name '{name}' contains invalid character {character:?}")]
    InvalidCharacter {
        /// Rejected name.
        name: String,
        /// First offending character.
        character: char,
    },
}

/// Canonical paths for one session's artefacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    session_dir: PathBuf,
    socket_path: PathBuf,
    data_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
    log_path: PathBuf,
}

impl SessionPaths {
    /// Derives the layout for `name` beneath `root`.
    #[must_use]
    pub fn new(root: &Path, name: &SessionName) -> Self {
        let session_dir = root.join(name.as_str());
        Self {
            socket_path: session_dir.join("sock"),
            data_dir: session_dir.join("data"),
            lock_path: session_dir.join("wbd.lock"),
            pid_path: session_dir.join("wbd.pid"),
            health_path: session_dir.join("wbd.health"),
            log_path: session_dir.join("wbd.log"),
            session_dir,
        }
    }

    /// Directory owning every artefact of the session.
    #[must_use]
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Local socket the daemon listens on.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Persistent browser profile directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Lock file guarding singleton startup.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// PID file of the running daemon.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    /// Health snapshot written by the daemon.
    #[must_use]
    pub fn health_path(&self) -> &Path {
        &self.health_path
    }

    /// Log file receiving the daemon's stderr.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Creates the session and profile directories with owner-only access.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory cannot be created or the socket path
    /// would exceed the platform limit for local sockets.
    pub fn prepare(&self) -> Result<(), SessionPathsError> {
        let length = self.socket_path.as_os_str().len();
        if length > MAX_SOCKET_PATH_BYTES {
            return Err(SessionPathsError::SocketPathTooLong {
                path: self.socket_path.clone(),
                length,
                limit: MAX_SOCKET_PATH_BYTES,
            });
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        for directory in [&self.session_dir, &self.data_dir] {
            if let Err(source) = builder.create(directory)
                && source.kind() != io::ErrorKind::AlreadyExists
            {
                return Err(SessionPathsError::CreateDirectory {
                    path: directory.clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}

/// Errors raised while preparing a session directory.
#[derive(Debug, Error)]
pub enum SessionPathsError {
    /// Creating a directory failed.
    #[error("failed to prepare session directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The socket path does not fit in a socket address.
    #[error("socket path '{path}' is {length} bytes; the limit is {limit}")]
    SocketPathTooLong {
        /// Offending socket path.
        path: PathBuf,
        /// Length in bytes.
        length: usize,
        /// Platform limit in bytes.
        limit: usize,
    },
}
