//! Browser automation engines.
//!
//! The session never talks to a browser directly. It drives an [`Engine`],
//! a narrow capability surface covering page lifecycle, navigation, content
//! extraction, instruction execution, cookie injection, and network event
//! subscription. The production engine is [`DriverEngine`], which delegates to
//! an external driver program over newline-delimited JSON on its standard
//! streams. [`EngineLauncher`] picks the browser flavour at daemon startup.

mod driver;
mod errors;
mod launcher;
mod lightpanda;

use std::fmt;
use std::sync::mpsc::Receiver;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wb_protocol::Cookie;

pub use self::driver::DriverEngine;
pub use self::errors::EngineError;
pub use self::launcher::{CHROME_ARGS, EngineLauncher, LaunchOptions, SystemEngineLauncher};
pub use self::lightpanda::{LIGHTPANDA_CDP_URL, LightpandaServer};

pub(crate) const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// Opaque handle of a page owned by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(u64);

impl PageId {
    /// Wraps a raw engine page number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "page-{}", self.0)
    }
}

/// Result of asking the engine to carry out instructions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActOutcome {
    /// Whether the engine believes the instructions were carried out.
    pub success: bool,
    /// Engine's account of what it did.
    #[serde(default)]
    pub description: String,
}

/// Capabilities the session needs from a browser.
///
/// Every call blocks until the engine answers. Raw network events delivered
/// through [`Engine::subscribe_network`] are untyped JSON; the capture
/// recorder validates them.
#[cfg_attr(test, mockall::automock)]
pub trait Engine: Send {
    /// Opens a blank page.
    fn new_page(&mut self) -> Result<PageId, EngineError>;

    /// Navigates `page` to `url`, failing unless the navigation succeeds.
    fn goto(&mut self, page: PageId, url: &str) -> Result<(), EngineError>;

    /// Returns the page's HTML.
    fn content(&mut self, page: PageId) -> Result<String, EngineError>;

    /// Returns the page's current URL.
    fn url(&mut self, page: PageId) -> Result<String, EngineError>;

    /// Carries out natural-language instructions on the page.
    fn act(&mut self, page: PageId, instructions: &str) -> Result<ActOutcome, EngineError>;

    /// Closes the page and releases its resources.
    fn close_page(&mut self, page: PageId) -> Result<(), EngineError>;

    /// Injects cookies into the browser context.
    fn add_cookies(&mut self, cookies: &[Cookie]) -> Result<(), EngineError>;

    /// Starts delivering the page's network events.
    fn subscribe_network(&mut self, page: PageId) -> Result<Receiver<Value>, EngineError>;

    /// Stops delivering the page's network events.
    fn unsubscribe_network(&mut self, page: PageId) -> Result<(), EngineError>;

    /// Shuts the browser down. Later calls fail.
    fn shutdown(&mut self) -> Result<(), EngineError>;
}
