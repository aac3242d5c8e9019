//! Engine selection and startup.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};
use wb_config::{BrowserKind, Config};

use super::driver::{DriverEngine, LaunchRequest};
use super::lightpanda::{LIGHTPANDA_CDP_URL, LightpandaServer};
use super::{ENGINE_TARGET, Engine, EngineError};

/// Arguments passed to Chrome on every launch.
pub const CHROME_ARGS: [&str; 4] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
];

/// What to launch for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Browser flavour.
    pub browser: BrowserKind,
    /// Run without a visible window.
    pub headless: bool,
    /// Persistent browser profile directory.
    pub data_dir: PathBuf,
}

/// Starts engines for the daemon.
pub trait EngineLauncher: Send + Sync {
    /// Launches a ready-to-use engine.
    ///
    /// # Errors
    ///
    /// Returns an error when the browser or its helpers fail to start.
    fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Engine>, EngineError>;
}

/// Launches engines through the configured driver program.
#[derive(Debug, Clone)]
pub struct SystemEngineLauncher {
    driver_program: String,
    lightpanda_program: String,
    call_timeout: Duration,
    startup_timeout: Duration,
}

impl SystemEngineLauncher {
    /// Builds a launcher from daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            driver_program: config.driver_program().to_owned(),
            lightpanda_program: config.lightpanda_program().to_owned(),
            call_timeout: config.request_timeout(),
            startup_timeout: config.startup_timeout(),
        }
    }
}

impl EngineLauncher for SystemEngineLauncher {
    fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Engine>, EngineError> {
        let (server, request) = match options.browser {
            BrowserKind::Chrome => (
                None,
                LaunchRequest {
                    headless: options.headless,
                    user_data_dir: Some(options.data_dir.display().to_string()),
                    cdp_url: None,
                    args: CHROME_ARGS.iter().map(|arg| (*arg).to_owned()).collect(),
                },
            ),
            BrowserKind::Lightpanda => (
                Some(LightpandaServer::start(
                    &self.lightpanda_program,
                    self.startup_timeout,
                )?),
                LaunchRequest {
                    headless: true,
                    user_data_dir: None,
                    cdp_url: Some(LIGHTPANDA_CDP_URL.to_owned()),
                    args: Vec::new(),
                },
            ),
        };
        let mut engine = DriverEngine::spawn(&self.driver_program, self.call_timeout, server)?;
        if let Err(error) = engine.launch(&request) {
            if let Err(shutdown_error) = engine.shutdown() {
                debug!(
                    target: ENGINE_TARGET,
                    error = %shutdown_error,
                    "driver shutdown after failed launch"
                );
            }
            return Err(error);
        }
        info!(
            target: ENGINE_TARGET,
            browser = %options.browser,
            headless = request.headless,
            "browser launched"
        );
        Ok(Box::new(engine))
    }
}
