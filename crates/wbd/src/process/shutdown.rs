use std::fmt;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::{debug, info};

use super::PROCESS_TARGET;

/// Why the daemon is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal arrived.
    Signal(i32),
    /// A client deleted the session.
    SessionDeleted,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
            Self::SessionDeleted => formatter.write_str("session deleted"),
        }
    }
}

/// Requests shutdown from inside the daemon.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    sender: Sender<ShutdownReason>,
}

impl ShutdownTrigger {
    /// Asks the daemon to shut down. Later requests are ignored.
    pub fn request(&self, reason: ShutdownReason) {
        if self.sender.send(reason).is_err() {
            debug!(target: PROCESS_TARGET, %reason, "shutdown already under way");
        }
    }
}

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Starts watching for external shutdown requests. Called once the
    /// process has detached.
    fn listen(&self) -> Result<(), ShutdownError>;

    /// Trigger for shutdown requests raised by the daemon itself.
    fn trigger(&self) -> ShutdownTrigger;

    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<ShutdownReason, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Every shutdown trigger went away before shutdown was requested.
    #[error("shutdown channel closed unexpectedly")]
    Closed,
}

/// Channel carrying shutdown requests from any thread to the main thread.
#[derive(Debug)]
pub(crate) struct ShutdownChannel {
    sender: Sender<ShutdownReason>,
    receiver: Mutex<Receiver<ShutdownReason>>,
}

impl ShutdownChannel {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub(crate) fn trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            sender: self.sender.clone(),
        }
    }

    pub(crate) fn wait(&self) -> Result<ShutdownReason, ShutdownError> {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv()
            .map_err(|_| ShutdownError::Closed)
    }
}

/// Shutdown listener that reacts to termination signals and session
/// deletion.
#[derive(Debug)]
pub struct SystemShutdownSignal {
    channel: ShutdownChannel,
    signals: Mutex<Option<Handle>>,
}

impl SystemShutdownSignal {
    /// Builds a listener; signals are not watched until [`Self::listen`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            channel: ShutdownChannel::new(),
            signals: Mutex::new(None),
        }
    }
}

impl Default for SystemShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn listen(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let trigger = self.channel.trigger();
        thread::Builder::new()
            .name("wbd-signals".to_owned())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!(target: PROCESS_TARGET, signal, "shutdown signal received");
                    trigger.request(ShutdownReason::Signal(signal));
                }
            })
            .map_err(|source| ShutdownError::Install { source })?;
        *self.signals.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn trigger(&self) -> ShutdownTrigger {
        self.channel.trigger()
    }

    fn wait(&self) -> Result<ShutdownReason, ShutdownError> {
        self.channel.wait()
    }
}

impl Drop for SystemShutdownSignal {
    fn drop(&mut self) {
        if let Some(handle) = self
            .signals
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.close();
        }
    }
}
