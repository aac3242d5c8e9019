use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use wb_protocol::{
    Action, Cookie, CurrentTab, DUMP_WINDOW_CHARS, InteractResult, NetworkEvent, Tab,
    unix_millis,
};

use super::{SESSION_TARGET, SessionError};
use crate::capture::CaptureRecorder;
use crate::engine::{Engine, EngineError, PageId};
use crate::text::html_to_text;

#[derive(Debug)]
struct OpenTab {
    record: Tab,
    page: PageId,
}

/// Tabs, the current-tab pointer, and the engine backing them.
///
/// A `Session` is owned by exactly one thread; every mutation happens through
/// `&mut self`.
pub struct Session {
    started: Instant,
    tabs: IndexMap<String, OpenTab>,
    current: Option<String>,
    engine: Box<dyn Engine>,
    capture: CaptureRecorder,
}

impl Session {
    /// Creates an empty session around a launched engine.
    #[must_use]
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            started: Instant::now(),
            tabs: IndexMap::new(),
            current: None,
            engine,
            capture: CaptureRecorder::default(),
        }
    }

    /// Seconds since the session started.
    #[must_use]
    pub fn runtime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Open tab names in creation order.
    #[must_use]
    pub fn list_tabs(&self) -> Vec<String> {
        self.tabs.keys().cloned().collect()
    }

    /// The current tab and its record.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoCurrentTab`] when no tab is current.
    pub fn current_tab(&self) -> Result<CurrentTab, SessionError> {
        let (name, tab) = self.current()?;
        Ok(CurrentTab {
            tab_name: name.to_owned(),
            tab: tab.record.clone(),
        })
    }

    /// Makes `name` the current tab.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] when no such tab is open.
    pub fn set_current_tab(&mut self, name: &str) -> Result<(), SessionError> {
        if !self.tabs.contains_key(name) {
            return Err(SessionError::NotFound {
                tab: name.to_owned(),
            });
        }
        self.current = Some(name.to_owned());
        Ok(())
    }

    /// Injects cookies into the browser context.
    ///
    /// # Errors
    ///
    /// Propagates engine failures.
    pub fn add_cookies(&mut self, cookies: &[Cookie]) -> Result<(), SessionError> {
        self.engine.add_cookies(cookies)?;
        debug!(target: SESSION_TARGET, count = cookies.len(), "cookies added");
        Ok(())
    }

    /// Opens a tab named `name` at `url`.
    ///
    /// The tab is only registered once navigation succeeds; a page created for
    /// a failed navigation is closed again. The first tab becomes current.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyExists`] for a taken name, or the engine
    /// failure that prevented the page from loading.
    pub fn new_tab(&mut self, name: &str, url: &str) -> Result<Tab, SessionError> {
        if self.tabs.contains_key(name) {
            return Err(SessionError::AlreadyExists {
                tab: name.to_owned(),
            });
        }
        let page = self.engine.new_page()?;
        if let Err(error) = self.engine.goto(page, url) {
            self.release_page(page);
            return Err(error.into());
        }
        let landed = self.engine.url(page).unwrap_or_else(|error| {
            warn!(target: SESSION_TARGET, %error, "could not read page url; keeping requested url");
            url.to_owned()
        });
        let record = Tab::opened(landed);
        self.tabs.insert(
            name.to_owned(),
            OpenTab {
                record: record.clone(),
                page,
            },
        );
        if self.tabs.len() == 1 {
            self.current = Some(name.to_owned());
        }
        info!(target: SESSION_TARGET, tab = name, %page, "tab opened");
        Ok(record)
    }

    /// Closes the tab named `name`.
    ///
    /// The tab is removed even when the engine fails to close its page; that
    /// failure is still reported.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] when no such tab is open, or the
    /// engine's close failure.
    pub fn close_tab(&mut self, name: &str) -> Result<(), SessionError> {
        let Some(tab) = self.tabs.shift_remove(name) else {
            return Err(SessionError::NotFound {
                tab: name.to_owned(),
            });
        };
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        self.capture.detach_page(tab.page);
        info!(target: SESSION_TARGET, tab = name, page = %tab.page, "tab closed");
        self.engine.close_page(tab.page)?;
        Ok(())
    }

    /// Navigates the current tab and records where it landed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoCurrentTab`] or the navigation failure.
    pub fn go(&mut self, url: &str) -> Result<(), SessionError> {
        let page = self.current_page()?;
        self.engine.goto(page, url)?;
        let landed = self.engine.url(page).unwrap_or_else(|error| {
            warn!(target: SESSION_TARGET, %error, "could not read page url; keeping requested url");
            url.to_owned()
        });
        let tab = self.current_mut()?;
        tab.record.url = landed;
        tab.record.actions.push(Action::Navigate {
            url: url.to_owned(),
            timestamp: unix_millis(),
        });
        Ok(())
    }

    /// Returns one window of the current page as HTML or text.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoCurrentTab`] or the engine's content failure.
    pub fn dump(&mut self, html: bool, offset: usize) -> Result<String, SessionError> {
        let page = self.current_page()?;
        let raw = self.engine.content(page)?;
        let text = if html { raw } else { html_to_text(&raw) };
        let window = text.chars().skip(offset).take(DUMP_WINDOW_CHARS).collect();
        self.current_mut()?.record.actions.push(Action::Dump {
            html,
            offset,
            timestamp: unix_millis(),
        });
        Ok(window)
    }

    /// Carries out `instructions` on the current tab.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoCurrentTab`], the engine failure, or
    /// [`EngineError::ActionFailed`] when the engine reports no success.
    pub fn interact(&mut self, instructions: &str) -> Result<InteractResult, SessionError> {
        let page = self.current_page()?;
        let outcome = self.engine.act(page, instructions)?;
        if !outcome.success {
            return Err(EngineError::ActionFailed {
                instructions: instructions.to_owned(),
                description: outcome.description,
            }
            .into());
        }
        let read_url = self.engine.url(page);
        let tab = self.current_mut()?;
        match read_url {
            Ok(url) => tab.record.url = url,
            Err(error) => {
                warn!(target: SESSION_TARGET, %error, "could not read page url; keeping last known url");
            }
        }
        let url = tab.record.url.clone();
        tab.record.actions.push(Action::Interact {
            instructions: instructions.to_owned(),
            timestamp: unix_millis(),
        });
        Ok(InteractResult {
            description: outcome.description,
            url,
        })
    }

    /// Starts capturing the current tab's network traffic.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoCurrentTab`] or the subscription failure.
    pub fn start_network_record(&mut self) -> Result<(), SessionError> {
        let page = self.current_page()?;
        self.capture.start(self.engine.as_mut(), page)?;
        Ok(())
    }

    /// Stops capturing and returns the ordered, correlated log.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoCurrentTab`] when no tab is current.
    pub fn stop_network_record(&mut self) -> Result<Vec<NetworkEvent>, SessionError> {
        self.current_page()?;
        Ok(self.capture.stop(self.engine.as_mut()))
    }

    /// Releases every page and shuts the engine down.
    pub fn close(mut self) {
        self.capture.release(self.engine.as_mut());
        for (name, tab) in self.tabs.drain(..) {
            if let Err(error) = self.engine.close_page(tab.page) {
                debug!(target: SESSION_TARGET, tab = name, %error, "page close during teardown failed");
            }
        }
        self.current = None;
        match self.engine.shutdown() {
            Ok(()) => info!(target: SESSION_TARGET, "engine shut down"),
            Err(error) => warn!(target: SESSION_TARGET, %error, "engine shutdown failed"),
        }
    }

    fn current(&self) -> Result<(&str, &OpenTab), SessionError> {
        let name = self.current.as_deref().ok_or(SessionError::NoCurrentTab)?;
        self.tabs
            .get(name)
            .map(|tab| (name, tab))
            .ok_or(SessionError::NoCurrentTab)
    }

    fn current_page(&self) -> Result<PageId, SessionError> {
        self.current().map(|(_, tab)| tab.page)
    }

    fn current_mut(&mut self) -> Result<&mut OpenTab, SessionError> {
        let name = self.current.as_deref().ok_or(SessionError::NoCurrentTab)?;
        self.tabs.get_mut(name).ok_or(SessionError::NoCurrentTab)
    }

    fn release_page(&mut self, page: PageId) {
        if let Err(error) = self.engine.close_page(page) {
            warn!(target: SESSION_TARGET, %page, %error, "failed to release page after failed navigation");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("tabs", &self.tabs)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
