//! Layout of the daemon's log records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How `wbd` lays out records in `wbd.log`.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record, fields flattened.
    Json,
    /// One short line per record.
    #[default]
    Compact,
}

impl LogFormat {
    /// Whether records are meant for machines; structured output never
    /// carries terminal colour codes.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}
