//! Records exchanged between the daemon and its clients.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// HTTP headers keyed by lower-case name.
pub type Headers = BTreeMap<String, String>;

/// Milliseconds since the Unix epoch, saturating at zero for clocks set
/// before 1970.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// One open tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Last known URL, after redirects.
    pub url: String,
    /// Actions applied to the tab, oldest first.
    pub actions: Vec<Action>,
    /// Creation time in Unix milliseconds.
    pub start_time: u64,
}

impl Tab {
    /// Creates a tab record with no actions.
    #[must_use]
    pub fn opened(url: String) -> Self {
        Self {
            url,
            actions: Vec::new(),
            start_time: unix_millis(),
        }
    }
}

/// The current tab together with its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTab {
    /// Name of the tab.
    pub tab_name: String,
    /// Tab record.
    #[serde(flatten)]
    pub tab: Tab,
}

/// Something done to a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// The tab navigated to `url`.
    Navigate {
        /// Requested URL.
        url: String,
        /// Unix milliseconds.
        timestamp: u64,
    },
    /// Content was read from the tab.
    Dump {
        /// Whether raw HTML was returned.
        html: bool,
        /// Character offset of the window.
        offset: usize,
        /// Unix milliseconds.
        timestamp: u64,
    },
    /// Instructions were executed on the tab.
    Interact {
        /// Instruction text.
        instructions: String,
        /// Unix milliseconds.
        timestamp: u64,
    },
}

impl Action {
    /// Time the action was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        match self {
            Self::Navigate { timestamp, .. }
            | Self::Dump { timestamp, .. }
            | Self::Interact { timestamp, .. } => *timestamp,
        }
    }
}

/// Captured network traffic, correlated by `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum NetworkEvent {
    /// A request left the page.
    Request {
        /// Engine-assigned request identifier.
        request_id: String,
        /// Engine timestamp in milliseconds.
        timestamp: f64,
        /// Request URL.
        url: String,
        /// HTTP method.
        method: String,
        /// Request headers.
        headers: Headers,
        /// Request body, when the engine exposed one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    /// A response arrived for an earlier request.
    Response {
        /// Identifier of the originating request.
        request_id: String,
        /// Engine timestamp in milliseconds.
        timestamp: f64,
        /// Response URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: Headers,
        /// Response body, when the engine exposed one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
}

impl NetworkEvent {
    /// Identifier correlating requests and responses.
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::Request { request_id, .. } | Self::Response { request_id, .. } => request_id,
        }
    }

    /// Engine timestamp in milliseconds.
    #[must_use]
    pub const fn timestamp(&self) -> f64 {
        match self {
            Self::Request { timestamp, .. } | Self::Response { timestamp, .. } => *timestamp,
        }
    }
}

/// Cookie `SameSite` policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Sent only for same-site requests.
    Strict,
    /// Sent for same-site requests and top-level navigations.
    #[default]
    Lax,
    /// Sent with every request.
    None,
}

/// Cookie handed to the engine.
///
/// Fields beyond these, such as `hostOnly` or `storeId` from browser exports,
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain the cookie applies to.
    pub domain: String,
    /// Path the cookie applies to.
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Expiry in Unix seconds; `-1` for a session cookie.
    #[serde(default = "session_cookie_expiry")]
    pub expires: f64,
    /// Hidden from page scripts.
    #[serde(default)]
    pub http_only: bool,
    /// Sent only over secure transports.
    #[serde(default)]
    pub secure: bool,
    /// Cross-site policy.
    #[serde(default)]
    pub same_site: SameSite,
    /// Partition key for partitioned cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
}

fn default_cookie_path() -> String {
    String::from("/")
}

const fn session_cookie_expiry() -> f64 {
    -1.0
}

/// Outcome of executing instructions on a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractResult {
    /// Engine's description of what it did.
    pub description: String,
    /// Page URL after the interaction.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_are_tagged_by_type() {
        let action = Action::Dump {
            html: true,
            offset: 8196,
            timestamp: 7,
        };
        assert_eq!(
            serde_json::to_value(&action).expect("serialise"),
            json!({"type": "dump", "html": true, "offset": 8196, "timestamp": 7})
        );
    }

    #[test]
    fn network_events_use_camel_case_fields() {
        let event = NetworkEvent::Response {
            request_id: "r1".to_owned(),
            timestamp: 12.5,
            url: "https://example.com/".to_owned(),
            status: 200,
            headers: Headers::new(),
            body: None,
        };
        assert_eq!(
            serde_json::to_value(&event).expect("serialise"),
            json!({
                "type": "response",
                "requestId": "r1",
                "timestamp": 12.5,
                "url": "https://example.com/",
                "status": 200,
                "headers": {}
            })
        );
    }

    #[test]
    fn cookie_defaults_fill_optional_fields() {
        let cookie: Cookie = serde_json::from_value(json!({
            "name": "sid",
            "value": "abc",
            "domain": ".example.com",
            "sameSite": "None",
            "secure": true
        }))
        .expect("decode cookie");
        assert_eq!(cookie.path, "/");
        assert!((cookie.expires + 1.0).abs() < f64::EPSILON);
        assert_eq!(cookie.same_site, SameSite::None);
        assert!(!cookie.http_only);
    }

    #[test]
    fn cookie_rejects_unknown_same_site_policy() {
        let result = serde_json::from_value::<Cookie>(json!({
            "name": "sid",
            "value": "abc",
            "domain": "example.com",
            "sameSite": "Sometimes"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn current_tab_flattens_the_record() {
        let current = CurrentTab {
            tab_name: "a".to_owned(),
            tab: Tab {
                url: "https://example.org/".to_owned(),
                actions: Vec::new(),
                start_time: 1,
            },
        };
        assert_eq!(
            serde_json::to_value(&current).expect("serialise"),
            json!({"tabName": "a", "url": "https://example.org/", "actions": [], "startTime": 1})
        );
    }
}
