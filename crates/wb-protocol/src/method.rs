use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Methods a session daemon answers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SessionMethod {
    /// Seconds since the session started.
    RuntimeSeconds,
    /// Names of the open tabs.
    ListTabs,
    /// Record of the current tab.
    GetCurrentTab,
    /// Repoint the current tab.
    SetCurrentTab,
    /// Inject cookies into the browser context.
    AddCookies,
    /// Open and navigate a new tab.
    NewTab,
    /// Close a tab and release its page.
    CloseTab,
    /// Read a window of the current page's content.
    Dump,
    /// Navigate the current tab.
    Go,
    /// Execute natural-language instructions on the current tab.
    Interact,
    /// Tear down the session and its daemon.
    DeleteSession,
    /// Begin capturing network traffic of the current tab.
    StartNetworkRecord,
    /// Stop capturing and return the captured traffic.
    StopNetworkRecord,
}

impl SessionMethod {
    /// Every method, in protocol order.
    pub const ALL: [Self; 13] = [
        Self::RuntimeSeconds,
        Self::ListTabs,
        Self::GetCurrentTab,
        Self::SetCurrentTab,
        Self::AddCookies,
        Self::NewTab,
        Self::CloseTab,
        Self::Dump,
        Self::Go,
        Self::Interact,
        Self::DeleteSession,
        Self::StartNetworkRecord,
        Self::StopNetworkRecord,
    ];

    /// Wire name of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Parses a wire name, reporting the rejected text on failure.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMethod`] for names outside the enumerated set.
    pub fn parse(name: &str) -> Result<Self, UnknownMethod> {
        Self::from_str(name).map_err(|_| UnknownMethod {
            method: name.to_owned(),
        })
    }
}

/// A method name outside the enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid method '{method}'")]
pub struct UnknownMethod {
    /// Rejected method name.
    pub method: String,
}
