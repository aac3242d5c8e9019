//! Browser engine selection.

use std::env;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Environment variable that overrides the configured engine.
pub const BROWSER_ENV_VAR: &str = "BROWSER";

/// Automation engines the daemon can drive.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BrowserKind {
    /// Chromium launched and owned by the driver.
    #[default]
    Chrome,
    /// Lightpanda server reached over its CDP endpoint.
    Lightpanda,
}

impl BrowserKind {
    /// Reads the `BROWSER` override. Unset, empty, or unknown values yield
    /// `None` so the configured engine applies.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        env::var(BROWSER_ENV_VAR)
            .ok()
            .and_then(|value| value.trim().parse().ok())
    }
}
