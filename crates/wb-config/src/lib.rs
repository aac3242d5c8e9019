//! Shared configuration for the `wb` client and the `wbd` daemon.
//!
//! Both binaries resolve the same [`Config`] through `ortho_config`, layering
//! built-in defaults, an optional configuration file, `WB_*` environment
//! variables, and command-line flags (highest precedence). The crate also owns
//! the on-disk session layout so the client and daemon agree on where sockets,
//! pid files, and browser profiles live.

mod arguments;
mod browser;
mod defaults;
mod logging;
mod session;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use arguments::{CONFIG_CLI_FLAGS, ConfigArgumentSplit, split_config_arguments};
pub use browser::{BROWSER_ENV_VAR, BrowserKind};
pub use defaults::{
    DEFAULT_DRIVER_PROGRAM, DEFAULT_LIGHTPANDA_PROGRAM, DEFAULT_LOG_FILTER,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STARTUP_TIMEOUT_SECS, default_log_filter,
    default_log_format, default_sessions_dir,
};
pub use logging::LogFormat;
pub use session::{
    DEFAULT_SESSION_NAME, SessionName, SessionNameError, SessionPaths, SessionPathsError,
};

/// Runtime configuration shared by the CLI and the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WB")]
pub struct Config {
    /// Directory holding one subdirectory per named session.
    #[ortho_config(default = defaults::default_sessions_dir())]
    pub sessions_dir: Utf8PathBuf,
    /// Tracing filter expression applied by the daemon.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Browser engine launched by new daemons.
    #[ortho_config(default = BrowserKind::Chrome)]
    pub browser: BrowserKind,
    /// Program implementing the engine driver protocol.
    #[ortho_config(default = DEFAULT_DRIVER_PROGRAM.to_owned())]
    pub driver_program: String,
    /// Program started when the lightpanda engine is selected.
    #[ortho_config(default = DEFAULT_LIGHTPANDA_PROGRAM.to_owned())]
    pub lightpanda_program: String,
    /// Seconds the client waits for a daemon response.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
    /// Seconds the client waits for a spawned daemon to become ready.
    #[ortho_config(default = DEFAULT_STARTUP_TIMEOUT_SECS)]
    pub startup_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
            browser: BrowserKind::Chrome,
            driver_program: DEFAULT_DRIVER_PROGRAM.to_owned(),
            lightpanda_program: DEFAULT_LIGHTPANDA_PROGRAM.to_owned(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Root directory for session state.
    #[must_use]
    pub fn sessions_dir(&self) -> &Utf8PathBuf {
        &self.sessions_dir
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Engine selected for new daemons, honouring the `BROWSER` override.
    #[must_use]
    pub fn browser(&self) -> BrowserKind {
        BrowserKind::from_env().unwrap_or(self.browser)
    }

    /// Driver program name or path.
    #[must_use]
    pub fn driver_program(&self) -> &str {
        &self.driver_program
    }

    /// Lightpanda program name or path.
    #[must_use]
    pub fn lightpanda_program(&self) -> &str {
        &self.lightpanda_program
    }

    /// Client-side wait for a single response.
    #[must_use]
    pub const fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Client-side wait for daemon readiness.
    #[must_use]
    pub const fn startup_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.startup_timeout_secs)
    }

    /// Derives the filesystem layout for a named session.
    #[must_use]
    pub fn session_paths(&self, name: &SessionName) -> SessionPaths {
        SessionPaths::new(self.sessions_dir.as_std_path(), name)
    }
}
