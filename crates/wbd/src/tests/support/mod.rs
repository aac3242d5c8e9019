//! Test doubles shared by the daemon suites.

mod config_loader;
mod engine;
mod reporter;

pub(crate) use config_loader::{FailingConfigLoader, TestConfigLoader};
pub(crate) use engine::{FakeEngine, FakeEngineLauncher};
pub(crate) use reporter::{HealthEvent, RecordingHealthReporter};
