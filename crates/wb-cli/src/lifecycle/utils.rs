//! Helpers shared by the lifecycle steps.

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use wb_config::SessionPaths;

use super::error::LifecycleError;

const LOG_TAIL_LINES: usize = 20;

/// Opens the session directory as a capability handle.
pub(super) fn open_session_dir(paths: &SessionPaths) -> Result<Dir, LifecycleError> {
    open_dir(paths.session_dir())
}

pub(super) fn open_dir(path: &Path) -> Result<Dir, LifecycleError> {
    Dir::open_ambient_dir(path, ambient_authority()).map_err(|source| {
        LifecycleError::OpenDirectory {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Name of a session artefact relative to the session directory.
pub(super) fn entry_name(path: &Path) -> &OsStr {
    path.file_name().unwrap_or(path.as_os_str())
}

/// Reads a session artefact, mapping a missing file to `None`.
pub(super) fn read_optional(dir: &Dir, path: &Path) -> io::Result<Option<String>> {
    match dir.read_to_string(entry_name(path)) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

/// Opens the daemon log for appending; the spawned daemon writes its stderr
/// here until it redirects its own output.
pub(super) fn open_log(paths: &SessionPaths) -> Result<File, LifecycleError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.log_path())
        .map_err(|source| LifecycleError::OpenLog {
            path: paths.log_path().to_path_buf(),
            source,
        })
}

/// Last lines of the daemon log, or an empty string when there is none.
pub(super) fn log_tail(paths: &SessionPaths) -> String {
    let Ok(dir) = open_session_dir(paths) else {
        return String::new();
    };
    let Ok(bytes) = dir.read(entry_name(paths.log_path())) else {
        return String::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines.get(start..).unwrap_or_default().join("\n")
}
