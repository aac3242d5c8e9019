//! Structured health reporting for daemon lifecycle events.

use wb_config::{BrowserKind, Config};

use crate::bootstrap::BootstrapError;
use crate::engine::EngineError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Receives daemon lifecycle events as they happen.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once configuration and telemetry are in place.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the browser engine is launched.
    fn engine_starting(&self, browser: BrowserKind);

    /// Invoked after the engine launches successfully.
    fn engine_ready(&self, browser: BrowserKind);

    /// Invoked when the engine fails to launch.
    fn engine_failed(&self, browser: BrowserKind, error: &EngineError);
}

/// Reporter that writes each event to the log under `wbd::health`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            sessions_dir = %config.sessions_dir(),
            browser = %config.browser(),
            request_timeout_secs = config.request_timeout_secs,
            log_filter = %config.log_filter(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn engine_starting(&self, browser: BrowserKind) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "engine_starting",
            %browser,
            "launching browser engine"
        );
    }

    fn engine_ready(&self, browser: BrowserKind) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "engine_ready",
            %browser,
            "browser engine ready"
        );
    }

    fn engine_failed(&self, browser: BrowserKind, error: &EngineError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "engine_failed",
            %browser,
            error = %error,
            "browser engine failed to launch"
        );
    }
}
