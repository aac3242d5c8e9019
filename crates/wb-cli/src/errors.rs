//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::connector::ConnectorError;
use crate::lifecycle::LifecycleError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("failed to read cookie file {path:?}: {source}")]
    ReadCookies {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse cookie file {path:?}: {source}")]
    ParseCookies {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode output: {0}")]
    EncodeOutput(#[source] serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}

impl AppError {
    /// Whether starting or reaching the daemon again might succeed.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            Self::Lifecycle(error) => error.is_retryable(),
            Self::Connector(error) => error.is_daemon_not_running(),
            _ => false,
        }
    }
}
