//! Tabs of one browser session and the actor that serialises access to them.

mod actor;
mod errors;
mod state;

pub use actor::{SessionActor, SessionHandle};
pub use errors::SessionError;
pub use state::Session;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");
