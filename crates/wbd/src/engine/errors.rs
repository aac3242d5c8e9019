//! Failures surfaced by browser automation engines.

use std::io;
use std::time::Duration;

use thiserror::Error;
use wb_protocol::FrameError;

/// Errors raised by an [`Engine`](super::Engine) or while launching one.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An engine helper process could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The driver's standard streams were not available after spawning.
    #[error("driver '{program}' did not expose its {stream} stream")]
    MissingStream {
        /// Driver program.
        program: String,
        /// Missing stream name.
        stream: &'static str,
    },
    /// Exchanging messages with the driver failed.
    #[error("driver transport failed: {source}")]
    Transport {
        /// Underlying framing error.
        #[source]
        source: FrameError,
    },
    /// The driver process exited; no further calls can succeed.
    #[error("engine driver exited")]
    DriverExited,
    /// The driver did not answer within the call budget.
    #[error("{operation} did not complete within {} ms", .timeout.as_millis())]
    Timeout {
        /// Driver operation.
        operation: &'static str,
        /// Budget that elapsed.
        timeout: Duration,
    },
    /// The driver reported a failure.
    #[error("{operation} failed: {message}")]
    Failed {
        /// Driver operation.
        operation: &'static str,
        /// Failure reported by the driver.
        message: String,
    },
    /// The driver replied with a value of the wrong shape.
    #[error("unexpected reply to {operation}: {source}")]
    Protocol {
        /// Driver operation.
        operation: &'static str,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// Navigation did not produce a successful response.
    #[error(
        "failed to navigate to {url} (status {})",
        .status.map_or_else(|| "unknown".to_owned(), |code| code.to_string())
    )]
    Navigation {
        /// Requested URL.
        url: String,
        /// HTTP status when one was received.
        status: Option<u16>,
    },
    /// The engine could not carry out the instructions.
    #[error("failed to interact with '{instructions}': {description}")]
    ActionFailed {
        /// Instructions that were attempted.
        instructions: String,
        /// Engine's account of the attempt.
        description: String,
    },
    /// A browser server exited before accepting connections.
    #[error("'{program}' exited during startup: {status}")]
    ServerExited {
        /// Server program.
        program: String,
        /// Exit status description.
        status: String,
    },
    /// A browser server did not accept connections in time.
    #[error("'{program}' did not accept connections within {} ms", .timeout.as_millis())]
    ServerTimeout {
        /// Server program.
        program: String,
        /// Startup budget.
        timeout: Duration,
    },
    /// Supervising a helper process failed.
    #[error("failed to supervise '{program}': {source}")]
    Supervise {
        /// Supervised program.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Builds a failure reported by the driver for `operation`.
    #[must_use]
    pub fn failed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            message: message.into(),
        }
    }
}

impl From<FrameError> for EngineError {
    fn from(source: FrameError) -> Self {
        Self::Transport { source }
    }
}
