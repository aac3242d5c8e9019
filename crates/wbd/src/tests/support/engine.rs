//! In-memory engine that behaves like a small, well-mannered browser.
//!
//! Every page starts blank. Navigation follows configured redirects, fails
//! for unreachable URLs, and otherwise serves either configured HTML or a
//! stock page. Clones share state so a test can keep a handle while the
//! session owns the boxed engine.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use wb_protocol::Cookie;

use crate::engine::{ActOutcome, Engine, EngineError, EngineLauncher, LaunchOptions, PageId};

const STOCK_PAGE: &str = "<html><head><title>Example Domain</title>\
<style>body { color: black; }</style></head>\
<body><h1>Example Domain</h1><p>This domain is for use in illustrative examples.</p></body></html>";

#[derive(Debug, Default)]
struct FakeBrowser {
    next_page: u64,
    pages: HashMap<PageId, String>,
    content: HashMap<String, String>,
    redirects: HashMap<String, String>,
    unreachable: HashSet<String>,
    act_outcome: Option<ActOutcome>,
    subscribers: HashMap<PageId, Sender<Value>>,
    cookies: Vec<Cookie>,
    closed: Vec<PageId>,
    shut_down: bool,
}

impl FakeBrowser {
    fn page_mut(&mut self, page: PageId) -> Result<&mut String, EngineError> {
        if self.shut_down {
            return Err(EngineError::DriverExited);
        }
        self.pages
            .get_mut(&page)
            .ok_or_else(|| EngineError::failed("page", format!("{page} is closed")))
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeEngine {
    browser: Arc<Mutex<FakeBrowser>>,
}

impl FakeEngine {
    fn browser(&self) -> std::sync::MutexGuard<'_, FakeBrowser> {
        self.browser.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with_redirect(self, from: &str, to: &str) -> Self {
        self.browser()
            .redirects
            .insert(from.to_owned(), to.to_owned());
        self
    }

    pub(crate) fn with_content(self, url: &str, html: &str) -> Self {
        self.browser()
            .content
            .insert(url.to_owned(), html.to_owned());
        self
    }

    pub(crate) fn with_unreachable(self, url: &str) -> Self {
        self.browser().unreachable.insert(url.to_owned());
        self
    }

    pub(crate) fn with_act_outcome(self, success: bool, description: &str) -> Self {
        self.browser().act_outcome = Some(ActOutcome {
            success,
            description: description.to_owned(),
        });
        self
    }

    /// Delivers a raw network event if `page` is subscribed.
    pub(crate) fn emit(&self, page: PageId, event: Value) {
        let browser = self.browser();
        if let Some(subscriber) = browser.subscribers.get(&page) {
            subscriber.send(event).ok();
        }
    }

    pub(crate) fn is_subscribed(&self, page: PageId) -> bool {
        self.browser().subscribers.contains_key(&page)
    }

    pub(crate) fn open_pages(&self) -> usize {
        self.browser().pages.len()
    }

    pub(crate) fn closed_pages(&self) -> Vec<PageId> {
        self.browser().closed.clone()
    }

    pub(crate) fn cookies(&self) -> Vec<Cookie> {
        self.browser().cookies.clone()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.browser().shut_down
    }
}

impl Engine for FakeEngine {
    fn new_page(&mut self) -> Result<PageId, EngineError> {
        let mut browser = self.browser();
        if browser.shut_down {
            return Err(EngineError::DriverExited);
        }
        browser.next_page += 1;
        let page = PageId::new(browser.next_page);
        browser.pages.insert(page, "about:blank".to_owned());
        Ok(page)
    }

    fn goto(&mut self, page: PageId, url: &str) -> Result<(), EngineError> {
        let mut browser = self.browser();
        if browser.unreachable.contains(url) {
            return Err(EngineError::Navigation {
                url: url.to_owned(),
                status: None,
            });
        }
        let landed = browser
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_owned());
        *browser.page_mut(page)? = landed;
        Ok(())
    }

    fn content(&mut self, page: PageId) -> Result<String, EngineError> {
        let mut browser = self.browser();
        let url = browser.page_mut(page)?.clone();
        Ok(browser
            .content
            .get(&url)
            .cloned()
            .unwrap_or_else(|| STOCK_PAGE.to_owned()))
    }

    fn url(&mut self, page: PageId) -> Result<String, EngineError> {
        Ok(self.browser().page_mut(page)?.clone())
    }

    fn act(&mut self, page: PageId, instructions: &str) -> Result<ActOutcome, EngineError> {
        let mut browser = self.browser();
        browser.page_mut(page)?;
        Ok(browser.act_outcome.clone().unwrap_or_else(|| ActOutcome {
            success: true,
            description: format!("carried out: {instructions}"),
        }))
    }

    fn close_page(&mut self, page: PageId) -> Result<(), EngineError> {
        let mut browser = self.browser();
        browser.page_mut(page)?;
        browser.pages.remove(&page);
        browser.subscribers.remove(&page);
        browser.closed.push(page);
        Ok(())
    }

    fn add_cookies(&mut self, cookies: &[Cookie]) -> Result<(), EngineError> {
        let mut browser = self.browser();
        if browser.shut_down {
            return Err(EngineError::DriverExited);
        }
        browser.cookies.extend_from_slice(cookies);
        Ok(())
    }

    fn subscribe_network(&mut self, page: PageId) -> Result<Receiver<Value>, EngineError> {
        let mut browser = self.browser();
        browser.page_mut(page)?;
        let (sender, receiver) = mpsc::channel();
        browser.subscribers.insert(page, sender);
        Ok(receiver)
    }

    fn unsubscribe_network(&mut self, page: PageId) -> Result<(), EngineError> {
        self.browser().subscribers.remove(&page);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        let mut browser = self.browser();
        browser.subscribers.clear();
        browser.shut_down = true;
        Ok(())
    }
}

/// Launcher handing out clones of one [`FakeEngine`], or failing on demand.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeEngineLauncher {
    engine: FakeEngine,
    fail: bool,
    launches: Arc<Mutex<Vec<LaunchOptions>>>,
}

impl FakeEngineLauncher {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn engine(&self) -> FakeEngine {
        self.engine.clone()
    }

    pub(crate) fn launches(&self) -> Vec<LaunchOptions> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EngineLauncher for FakeEngineLauncher {
    fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Engine>, EngineError> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options.clone());
        if self.fail {
            return Err(EngineError::Spawn {
                program: "wb-driver".to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
            });
        }
        Ok(Box::new(self.engine.clone()))
    }
}
