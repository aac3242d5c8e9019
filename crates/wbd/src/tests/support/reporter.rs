//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::{Mutex, PoisonError};

use wb_config::{BrowserKind, Config};

use crate::bootstrap::BootstrapError;
use crate::engine::EngineError;
use crate::health::HealthReporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    EngineStarting(BrowserKind),
    EngineReady(BrowserKind),
    EngineFailed { browser: BrowserKind, message: String },
}

#[derive(Debug, Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn engine_starting(&self, browser: BrowserKind) {
        self.record(HealthEvent::EngineStarting(browser));
    }

    fn engine_ready(&self, browser: BrowserKind) {
        self.record(HealthEvent::EngineReady(browser));
    }

    fn engine_failed(&self, browser: BrowserKind, error: &EngineError) {
        self.record(HealthEvent::EngineFailed {
            browser,
            message: error.to_string(),
        });
    }
}
