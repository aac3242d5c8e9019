//! Daemon process supervision: daemonisation, lock and PID management,
//! health snapshots, and shutdown handling.

pub(crate) mod daemonizer;
mod errors;
mod files;
mod guard;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::{DaemonOptions, LaunchMode, run_daemon};
pub(crate) use shutdown::{ShutdownReason, ShutdownTrigger};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
pub(crate) const FOREGROUND_ENV_VAR: &str = "WBD_FOREGROUND";
