use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::data_local_dir;

use crate::logging::LogFormat;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Driver program speaking the engine protocol on stdio.
pub const DEFAULT_DRIVER_PROGRAM: &str = "wb-driver";

/// Lightpanda executable launched for the lightweight engine.
pub const DEFAULT_LIGHTPANDA_PROGRAM: &str = "lightpanda";

/// Seconds the client waits for a single daemon response.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Seconds the client waits for a freshly spawned daemon.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default log filter expression used by the daemon.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format. Daemon logs land in a per-session file read by
/// people, so the compact formatter is preferred.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the default root directory for session state.
#[must_use]
pub fn default_sessions_dir() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match data_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("wb");
    if apply_namespace {
        base.push(user_namespace());
    }
    base.push("sessions");
    base
}

#[cfg(unix)]
fn data_base_directory() -> Option<Utf8PathBuf> {
    data_local_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn data_base_directory() -> Option<Utf8PathBuf> {
    None
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn user_namespace() -> String {
    String::from("shared")
}
