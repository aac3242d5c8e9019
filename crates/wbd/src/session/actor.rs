//! The thread that owns the session.
//!
//! Every connection handler submits requests through a [`SessionHandle`]. The
//! actor applies them one at a time in arrival order, so no two requests ever
//! observe a half-applied mutation.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use serde_json::Value;
use tracing::{debug, info, warn};
use wb_protocol::SessionRequest;

use super::{SESSION_TARGET, Session, SessionError};
use crate::dispatch::route;

type Reply = Result<Value, SessionError>;

enum SessionCommand {
    Execute {
        request: SessionRequest,
        reply: Sender<Reply>,
    },
    Shutdown,
}

/// Cloneable sender of requests to the session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: Sender<SessionCommand>,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execute { request, .. } => formatter
                .debug_struct("Execute")
                .field("method", &request.method())
                .finish_non_exhaustive(),
            Self::Shutdown => formatter.write_str("Shutdown"),
        }
    }
}

impl SessionHandle {
    /// Applies `request` and waits for its result.
    ///
    /// # Errors
    ///
    /// Returns the operation's failure, [`SessionError::ShuttingDown`] once
    /// the session has been deleted, or [`SessionError::Unavailable`] when
    /// the actor has stopped.
    pub fn execute(&self, request: SessionRequest) -> Result<Value, SessionError> {
        let (reply, result) = mpsc::channel();
        self.commands
            .send(SessionCommand::Execute { request, reply })
            .map_err(|_| SessionError::Unavailable)?;
        result.recv().map_err(|_| SessionError::Unavailable)?
    }
}

/// Running session actor.
#[derive(Debug)]
pub struct SessionActor {
    handle: SessionHandle,
    thread: Option<JoinHandle<()>>,
}

impl SessionActor {
    /// Moves `session` onto a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns an error when the thread cannot be spawned.
    pub fn spawn(session: Session) -> io::Result<Self> {
        let (commands, inbox) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("wbd-session".to_owned())
            .spawn(move || run(session, &inbox))?;
        Ok(Self {
            handle: SessionHandle { commands },
            thread: Some(thread),
        })
    }

    /// Handle for submitting requests.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stops the actor after the requests already queued, closing every page
    /// and shutting the engine down.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.handle.commands.send(SessionCommand::Shutdown).is_err() {
            debug!(target: SESSION_TARGET, "session actor already stopped");
        }
        if thread.join().is_err() {
            warn!(target: SESSION_TARGET, "session actor panicked");
        }
    }
}

impl Drop for SessionActor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(mut session: Session, inbox: &Receiver<SessionCommand>) {
    info!(target: SESSION_TARGET, "session ready");
    let mut deleted = false;
    while let Ok(command) = inbox.recv() {
        let SessionCommand::Execute { request, reply } = command else {
            break;
        };
        let result = if deleted {
            Err(SessionError::ShuttingDown)
        } else {
            let deleting = matches!(request, SessionRequest::DeleteSession);
            let result = route(&mut session, request);
            deleted = deleting && result.is_ok();
            result
        };
        if reply.send(result).is_err() {
            debug!(target: SESSION_TARGET, "requester went away before the reply");
        }
    }
    session.close();
    info!(target: SESSION_TARGET, "session closed");
}
