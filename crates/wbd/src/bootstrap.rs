//! Daemon bootstrap orchestration.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use wb_config::Config;

use crate::engine::{EngineError, EngineLauncher, LaunchOptions};
use crate::health::HealthReporter;
use crate::session::Session;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no valid configuration can be built.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that resolves configuration from files, the environment, and the
/// supplied configuration flags.
#[derive(Debug, Default, Clone)]
pub struct SystemConfigLoader {
    arguments: Vec<OsString>,
}

impl SystemConfigLoader {
    /// Builds a loader for the program name followed by configuration flags.
    #[must_use]
    pub const fn new(arguments: Vec<OsString>) -> Self {
        Self { arguments }
    }
}

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(self.arguments.iter().cloned())
    }
}

/// Loader that always yields a pre-resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The browser engine could not be launched. No session exists.
    #[error("failed to launch browser engine: {source}")]
    Engine {
        /// Underlying engine error.
        #[source]
        source: EngineError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    session: Session,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Releases the session for the actor thread.
    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the daemon: configuration, telemetry, then the browser engine.
///
/// Engine launch failure is fatal; no session is created.
///
/// # Errors
///
/// Returns the first stage that failed, after reporting it.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    launcher: &dyn EngineLauncher,
    options: &LaunchOptions,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };
    reporter.bootstrap_succeeded(&config);

    reporter.engine_starting(options.browser);
    let engine = match launcher.launch(options) {
        Ok(engine) => engine,
        Err(source) => {
            reporter.engine_failed(options.browser, &source);
            let error = BootstrapError::Engine { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };
    reporter.engine_ready(options.browser);

    Ok(Daemon {
        config,
        session: Session::new(engine),
        telemetry,
    })
}
