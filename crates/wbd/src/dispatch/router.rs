//! Routing of validated requests to session operations.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use wb_protocol::SessionRequest;

use crate::session::{Session, SessionError};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Applies `request` to `session` and encodes the result.
///
/// `deleteSession` only acknowledges here; tearing the daemon down is the
/// caller's job once the acknowledgement has been delivered.
pub(crate) fn route(session: &mut Session, request: SessionRequest) -> Result<Value, SessionError> {
    debug!(target: DISPATCH_TARGET, method = %request.method(), "routing request");
    match request {
        SessionRequest::RuntimeSeconds => encode(session.runtime_seconds()),
        SessionRequest::ListTabs => encode(session.list_tabs()),
        SessionRequest::GetCurrentTab => encode(session.current_tab()?),
        SessionRequest::SetCurrentTab { tab_name } => {
            session.set_current_tab(&tab_name).map(|()| Value::Null)
        }
        SessionRequest::AddCookies { cookies } => {
            session.add_cookies(&cookies).map(|()| Value::Null)
        }
        SessionRequest::NewTab { tab_name, url } => encode(session.new_tab(&tab_name, &url)?),
        SessionRequest::CloseTab { tab_name } => session.close_tab(&tab_name).map(|()| Value::Null),
        SessionRequest::Dump { html, offset } => session.dump(html, offset).map(Value::String),
        SessionRequest::Go { url } => session.go(&url).map(|()| Value::Null),
        SessionRequest::Interact { instructions } => encode(session.interact(&instructions)?),
        SessionRequest::DeleteSession => Ok(Value::Null),
        SessionRequest::StartNetworkRecord => {
            session.start_network_record().map(|()| Value::Null)
        }
        SessionRequest::StopNetworkRecord => encode(session.stop_network_record()?),
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value, SessionError> {
    Ok(serde_json::to_value(value)?)
}
