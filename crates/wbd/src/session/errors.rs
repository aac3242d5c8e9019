//! Failures returned by session operations.

use thiserror::Error;

use crate::engine::EngineError;

/// Errors surfaced to clients by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No open tab has the requested name.
    #[error("tab '{tab}' does not exist")]
    NotFound {
        /// Requested tab name.
        tab: String,
    },
    /// An open tab already uses the name.
    #[error("tab '{tab}' already exists")]
    AlreadyExists {
        /// Requested tab name.
        tab: String,
    },
    /// The operation needs a current tab and none is set.
    #[error("no current tab set")]
    NoCurrentTab,
    /// The engine failed while serving the request.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The session is being deleted and accepts no further requests.
    #[error("session is shutting down")]
    ShuttingDown,
    /// The session actor is no longer running.
    #[error("session is unavailable")]
    Unavailable,
    /// The operation's result could not be encoded.
    #[error("failed to encode result: {source}")]
    Encode {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
}
