//! Typed session requests and their structural validation.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use crate::message::Request;
use crate::method::SessionMethod;
use crate::model::Cookie;

/// Characters returned by one `dump` window.
pub const DUMP_WINDOW_CHARS: usize = 8196;

/// A request rejected before it reached the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The method is outside the enumerated set.
    #[error("invalid method '{method}'")]
    UnknownMethod {
        /// Rejected method name.
        method: String,
    },
    /// The parameters do not match the method's shape.
    #[error("invalid parameters for {method}: {detail}")]
    InvalidParams {
        /// Method whose parameters were rejected.
        method: SessionMethod,
        /// What was wrong with them.
        detail: String,
    },
}

/// A validated request, one variant per method.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRequest {
    /// Seconds since the session started.
    RuntimeSeconds,
    /// Names of the open tabs.
    ListTabs,
    /// Record of the current tab.
    GetCurrentTab,
    /// Repoint the current tab.
    SetCurrentTab {
        /// Tab to make current.
        tab_name: String,
    },
    /// Inject cookies into the browser context.
    AddCookies {
        /// Cookies to inject.
        cookies: Vec<Cookie>,
    },
    /// Open a tab and navigate it.
    NewTab {
        /// Name of the new tab.
        tab_name: String,
        /// Initial URL.
        url: String,
    },
    /// Close a tab.
    CloseTab {
        /// Tab to close.
        tab_name: String,
    },
    /// Read a window of the current page.
    Dump {
        /// Return raw HTML instead of text.
        html: bool,
        /// Character offset of the window.
        offset: usize,
    },
    /// Navigate the current tab.
    Go {
        /// Destination URL.
        url: String,
    },
    /// Execute instructions on the current tab.
    Interact {
        /// Natural-language instructions.
        instructions: String,
    },
    /// Tear the session down.
    DeleteSession,
    /// Begin capturing network traffic.
    StartNetworkRecord,
    /// Stop capturing and return the log.
    StopNetworkRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TabNameParams {
    tab_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct NewTabParams {
    tab_name: String,
    url: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DumpParams {
    html: bool,
    #[serde(default)]
    offset: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UrlParams {
    url: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InteractParams {
    instructions: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CookieParams {
    cookies: Vec<Cookie>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

impl SessionRequest {
    /// Validates a wire request.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the method is unknown or the
    /// parameters do not match its shape.
    pub fn from_wire(request: &Request) -> Result<Self, ValidationError> {
        let method =
            SessionMethod::parse(&request.method).map_err(|error| ValidationError::UnknownMethod {
                method: error.method,
            })?;
        let params = &request.params;
        match method {
            SessionMethod::RuntimeSeconds => no_params(method, params).map(|()| Self::RuntimeSeconds),
            SessionMethod::ListTabs => no_params(method, params).map(|()| Self::ListTabs),
            SessionMethod::GetCurrentTab => no_params(method, params).map(|()| Self::GetCurrentTab),
            SessionMethod::DeleteSession => no_params(method, params).map(|()| Self::DeleteSession),
            SessionMethod::StartNetworkRecord => {
                no_params(method, params).map(|()| Self::StartNetworkRecord)
            }
            SessionMethod::StopNetworkRecord => {
                no_params(method, params).map(|()| Self::StopNetworkRecord)
            }
            SessionMethod::SetCurrentTab => tab_name(method, params)
                .map(|tab_name| Self::SetCurrentTab { tab_name }),
            SessionMethod::CloseTab => {
                tab_name(method, params).map(|tab_name| Self::CloseTab { tab_name })
            }
            SessionMethod::NewTab => {
                let NewTabParams { tab_name, url } = typed(method, params)?;
                require_tab_name(method, &tab_name)?;
                require_url(method, &url)?;
                Ok(Self::NewTab { tab_name, url })
            }
            SessionMethod::Dump => typed::<DumpParams>(method, params)
                .map(|DumpParams { html, offset }| Self::Dump { html, offset }),
            SessionMethod::Go => {
                let UrlParams { url } = typed(method, params)?;
                require_url(method, &url)?;
                Ok(Self::Go { url })
            }
            SessionMethod::Interact => {
                let InteractParams { instructions } = typed(method, params)?;
                if instructions.trim().is_empty() {
                    return Err(invalid(method, "instructions must not be empty"));
                }
                Ok(Self::Interact { instructions })
            }
            SessionMethod::AddCookies => typed::<CookieParams>(method, params)
                .map(|CookieParams { cookies }| Self::AddCookies { cookies }),
        }
    }

    /// Method this request invokes.
    #[must_use]
    pub const fn method(&self) -> SessionMethod {
        match self {
            Self::RuntimeSeconds => SessionMethod::RuntimeSeconds,
            Self::ListTabs => SessionMethod::ListTabs,
            Self::GetCurrentTab => SessionMethod::GetCurrentTab,
            Self::SetCurrentTab { .. } => SessionMethod::SetCurrentTab,
            Self::AddCookies { .. } => SessionMethod::AddCookies,
            Self::NewTab { .. } => SessionMethod::NewTab,
            Self::CloseTab { .. } => SessionMethod::CloseTab,
            Self::Dump { .. } => SessionMethod::Dump,
            Self::Go { .. } => SessionMethod::Go,
            Self::Interact { .. } => SessionMethod::Interact,
            Self::DeleteSession => SessionMethod::DeleteSession,
            Self::StartNetworkRecord => SessionMethod::StartNetworkRecord,
            Self::StopNetworkRecord => SessionMethod::StopNetworkRecord,
        }
    }

    /// Builds the wire envelope for this request.
    #[must_use]
    pub fn to_wire(&self) -> Request {
        let params = match self {
            Self::RuntimeSeconds
            | Self::ListTabs
            | Self::GetCurrentTab
            | Self::DeleteSession
            | Self::StartNetworkRecord
            | Self::StopNetworkRecord => json!({}),
            Self::SetCurrentTab { tab_name } | Self::CloseTab { tab_name } => {
                json!({ "tabName": tab_name })
            }
            Self::AddCookies { cookies } => json!({ "cookies": cookies }),
            Self::NewTab { tab_name, url } => json!({ "tabName": tab_name, "url": url }),
            Self::Dump { html, offset } => json!({ "html": html, "offset": offset }),
            Self::Go { url } => json!({ "url": url }),
            Self::Interact { instructions } => json!({ "instructions": instructions }),
        };
        Request {
            method: self.method().as_str().to_owned(),
            params,
        }
    }
}

fn invalid(method: SessionMethod, detail: impl Into<String>) -> ValidationError {
    ValidationError::InvalidParams {
        method,
        detail: detail.into(),
    }
}

fn typed<T: DeserializeOwned>(method: SessionMethod, params: &Value) -> Result<T, ValidationError> {
    if !params.is_object() {
        return Err(invalid(method, "params must be an object"));
    }
    T::deserialize(params).map_err(|error| invalid(method, error.to_string()))
}

fn no_params(method: SessionMethod, params: &Value) -> Result<(), ValidationError> {
    if params.is_null() {
        return Ok(());
    }
    typed::<NoParams>(method, params).map(|NoParams {}| ())
}

fn tab_name(method: SessionMethod, params: &Value) -> Result<String, ValidationError> {
    let TabNameParams { tab_name } = typed(method, params)?;
    require_tab_name(method, &tab_name)?;
    Ok(tab_name)
}

fn require_tab_name(method: SessionMethod, tab_name: &str) -> Result<(), ValidationError> {
    if tab_name.is_empty() {
        return Err(invalid(method, "tabName must not be empty"));
    }
    Ok(())
}

fn require_url(method: SessionMethod, url: &str) -> Result<(), ValidationError> {
    url::Url::parse(url)
        .map(drop)
        .map_err(|error| invalid(method, format!("url '{url}' is not a valid absolute URL: {error}")))
}
