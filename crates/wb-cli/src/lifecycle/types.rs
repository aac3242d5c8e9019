//! Values shared across lifecycle operations.

use std::ffi::{OsStr, OsString};

use serde::Serialize;
use wb_config::Config;

/// Configuration context available to lifecycle operations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LifecycleContext<'a> {
    pub config: &'a Config,
    /// Program name followed by the configuration flags, forwarded to `wbd`.
    pub config_arguments: &'a [OsString],
    pub daemon_binary: Option<&'a OsStr>,
}

/// One row of `wb session list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionStatus {
    pub name: String,
    pub is_running: bool,
}
