//! The `wbd` browser session daemon.
//!
//! One daemon serves one named session. At startup it resolves configuration,
//! initialises structured telemetry, launches a browser engine through the
//! configured driver, and then serves newline-delimited JSON requests on the
//! session's Unix socket until the session is deleted or a termination signal
//! arrives.
//!
//! All session state lives on a single actor thread. Connection threads only
//! decode requests, forward them to the actor, and write back its replies, so
//! concurrent clients observe every operation as atomic.
//!
//! Process supervision follows the session directory layout defined in
//! [`wb_config::SessionPaths`]: an exclusive lock file, a PID file, and a JSON
//! health snapshot that clients poll while waiting for readiness.

mod args;
mod bootstrap;
mod capture;
mod dispatch;
mod engine;
mod health;
mod process;
mod session;
mod telemetry;
mod text;
mod transport;

pub use args::DaemonArgs;
pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use engine::{
    ActOutcome, CHROME_ARGS, DriverEngine, Engine, EngineError, EngineLauncher, LaunchOptions,
    LightpandaServer, PageId, SystemEngineLauncher,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{DaemonOptions, LaunchError, LaunchMode, run_daemon};
pub use session::{Session, SessionActor, SessionError, SessionHandle};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
