//! Daemon process spawning.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::process::{Child, Command, Stdio};

use wb_config::SessionName;

use super::error::LifecycleError;

/// Environment variable naming the daemon binary.
pub(crate) const DAEMON_BINARY_ENV_VAR: &str = "WBD_BIN";
const DAEMON_BINARY_NAME: &str = "wbd";

/// Launch parameters for one daemon.
#[derive(Debug)]
pub(super) struct DaemonLaunch<'a> {
    pub config_arguments: &'a [OsString],
    pub binary_override: Option<&'a OsStr>,
    pub session: &'a SessionName,
    pub debug: bool,
}

/// Spawns `wbd` for the session, forwarding the configuration flags and
/// sending the launched process's output to `log`.
pub(super) fn spawn_daemon(launch: &DaemonLaunch<'_>, log: File) -> Result<Child, LifecycleError> {
    let binary = resolve_daemon_binary(launch.binary_override);
    let mut command = Command::new(&binary);
    // argv[0] is the client's own name.
    command.args(launch.config_arguments.iter().skip(1));
    command.arg("--session").arg(launch.session.as_str());
    if launch.debug {
        command.arg("--debug");
    }
    let stdout = log
        .try_clone()
        .map_err(|source| LifecycleError::LaunchDaemon {
            binary: binary.clone(),
            source,
        })?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(log));
    command
        .spawn()
        .map_err(|source| LifecycleError::LaunchDaemon { binary, source })
}

/// Override, then `WBD_BIN`, then `wbd` beside the running executable, then
/// `wbd` on `PATH`.
pub(super) fn resolve_daemon_binary(binary_override: Option<&OsStr>) -> OsString {
    binary_override
        .map(OsString::from)
        .or_else(|| env::var_os(DAEMON_BINARY_ENV_VAR))
        .or_else(sibling_binary)
        .unwrap_or_else(|| OsString::from(DAEMON_BINARY_NAME))
}

fn sibling_binary() -> Option<OsString> {
    let executable = env::current_exe().ok()?;
    let candidate = executable
        .parent()?
        .join(format!("{DAEMON_BINARY_NAME}{}", env::consts::EXE_SUFFIX));
    candidate.is_file().then(|| candidate.into_os_string())
}
