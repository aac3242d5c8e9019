//! Network capture for the current tab.
//!
//! While a capture is active the engine delivers raw events for one page into
//! a channel. Stopping drains that channel, validates each event against
//! [`NetworkEvent`], and produces a snapshot ordered by timestamp in which
//! every response follows its request. The snapshot stays readable until the
//! next capture starts.

use std::collections::HashSet;
use std::sync::mpsc::Receiver;

use serde_json::Value;
use tracing::{debug, warn};
use wb_protocol::NetworkEvent;

use crate::engine::{Engine, EngineError, PageId};
use crate::session::SESSION_TARGET;

#[derive(Debug)]
struct ActiveCapture {
    page: PageId,
    events: Receiver<Value>,
}

/// Records network events for at most one page at a time.
#[derive(Debug, Default)]
pub(crate) struct CaptureRecorder {
    active: Option<ActiveCapture>,
    snapshot: Vec<NetworkEvent>,
}

impl CaptureRecorder {
    /// Starts capturing `page`, discarding any capture already running.
    pub(crate) fn start(&mut self, engine: &mut dyn Engine, page: PageId) -> Result<(), EngineError> {
        if let Some(previous) = self.active.take() {
            warn!(
                target: SESSION_TARGET,
                previous = %previous.page,
                page = %page,
                "network capture already running; discarding it"
            );
            unsubscribe(engine, previous.page);
        }
        self.snapshot.clear();
        let events = engine.subscribe_network(page)?;
        self.active = Some(ActiveCapture { page, events });
        debug!(target: SESSION_TARGET, %page, "network capture started");
        Ok(())
    }

    /// Stops the active capture and returns its snapshot. Without an active
    /// capture the previous snapshot is returned unchanged.
    pub(crate) fn stop(&mut self, engine: &mut dyn Engine) -> Vec<NetworkEvent> {
        if let Some(capture) = self.active.take() {
            unsubscribe(engine, capture.page);
            self.snapshot = correlate(capture.events.try_iter().filter_map(project));
            debug!(
                target: SESSION_TARGET,
                page = %capture.page,
                events = self.snapshot.len(),
                "network capture stopped"
            );
        }
        self.snapshot.clone()
    }

    /// Drops the capture if it is bound to `page`. Used when the page closes.
    pub(crate) fn detach_page(&mut self, page: PageId) {
        if self.active.as_ref().is_some_and(|capture| capture.page == page) {
            self.active = None;
            debug!(target: SESSION_TARGET, %page, "network capture detached from closed page");
        }
    }

    /// Unsubscribes any active capture before the engine shuts down.
    pub(crate) fn release(&mut self, engine: &mut dyn Engine) {
        if let Some(capture) = self.active.take() {
            unsubscribe(engine, capture.page);
        }
    }

    #[cfg(test)]
    pub(crate) const fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

fn unsubscribe(engine: &mut dyn Engine, page: PageId) {
    if let Err(error) = engine.unsubscribe_network(page) {
        warn!(target: SESSION_TARGET, %page, %error, "failed to unsubscribe from network events");
    }
}

fn project(raw: Value) -> Option<NetworkEvent> {
    match serde_json::from_value(raw) {
        Ok(event) => Some(event),
        Err(error) => {
            warn!(target: SESSION_TARGET, %error, "dropping malformed network event");
            None
        }
    }
}

/// Orders events by timestamp and removes responses without an earlier
/// request.
fn correlate(events: impl Iterator<Item = NetworkEvent>) -> Vec<NetworkEvent> {
    let mut ordered: Vec<NetworkEvent> = events.collect();
    ordered.sort_by(|left, right| left.timestamp().total_cmp(&right.timestamp()));
    let mut requested = HashSet::new();
    ordered.retain(|event| match event {
        NetworkEvent::Request { request_id, .. } => {
            requested.insert(request_id.clone());
            true
        }
        NetworkEvent::Response { request_id, .. } => {
            let known = requested.contains(request_id);
            if !known {
                debug!(target: SESSION_TARGET, request_id, "dropping response without request");
            }
            known
        }
    });
    ordered
}
