//! Engine backed by an external driver process.
//!
//! The driver reads one JSON request per line on stdin and writes replies and
//! network events, one per line, on stdout. Its stderr is inherited so driver
//! diagnostics land in the daemon log. A reader thread routes replies to the
//! waiting call by `id` and network events to the page's subscriber.

use std::collections::HashMap;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use wb_protocol::{Cookie, FrameError, FrameReader, MAX_RESPONSE_FRAME_BYTES, write_frame};

use super::lightpanda::LightpandaServer;
use super::{ActOutcome, ENGINE_TARGET, Engine, EngineError, PageId};

const EXIT_GRACE: Duration = Duration::from_secs(5);
const EXIT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    op: &'a str,
    #[serde(flatten)]
    params: Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum DriverMessage {
    Reply {
        id: u64,
        ok: bool,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        error: Option<String>,
    },
    Network {
        page: PageId,
        event: Value,
    },
}

#[derive(Debug)]
struct DriverReply {
    ok: bool,
    value: Value,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct Routing {
    pending: HashMap<u64, Sender<DriverReply>>,
    subscribers: HashMap<PageId, Sender<Value>>,
    exited: bool,
}

#[derive(Debug, Deserialize)]
struct NavigationOutcome {
    ok: bool,
    #[serde(default)]
    status: Option<u16>,
}

/// Options sent with the driver's `launch` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LaunchRequest {
    pub(crate) headless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) user_data_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cdp_url: Option<String>,
    pub(crate) args: Vec<String>,
}

/// [`Engine`] implemented by a driver child process.
#[derive(Debug)]
pub struct DriverEngine {
    program: String,
    child: Child,
    stdin: ChildStdin,
    routing: Arc<Mutex<Routing>>,
    reader: Option<JoinHandle<()>>,
    next_id: u64,
    call_timeout: Duration,
    server: Option<LightpandaServer>,
    shut_down: bool,
}

impl DriverEngine {
    /// Spawns the driver. `server` is kept alive for as long as the engine.
    ///
    /// # Errors
    ///
    /// Returns an error when the process cannot be started or its standard
    /// streams are unavailable.
    pub fn spawn(
        program: &str,
        call_timeout: Duration,
        server: Option<LightpandaServer>,
    ) -> Result<Self, EngineError> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: program.to_owned(),
                source,
            })?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            terminate(&mut child, program);
            return Err(EngineError::MissingStream {
                program: program.to_owned(),
                stream: "stdio",
            });
        };
        let routing = Arc::new(Mutex::new(Routing::default()));
        let reader_routing = Arc::clone(&routing);
        let reader = thread::Builder::new()
            .name("wb-driver-reader".to_owned())
            .spawn(move || route_driver_output(stdout, &reader_routing));
        let reader = match reader {
            Ok(handle) => handle,
            Err(source) => {
                terminate(&mut child, program);
                return Err(EngineError::Supervise {
                    program: program.to_owned(),
                    source,
                });
            }
        };
        info!(
            target: ENGINE_TARGET,
            program,
            pid = child.id(),
            "engine driver started"
        );
        Ok(Self {
            program: program.to_owned(),
            child,
            stdin,
            routing,
            reader: Some(reader),
            next_id: 1,
            call_timeout,
            server,
            shut_down: false,
        })
    }

    /// Asks the driver to start its browser.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure when the browser cannot be launched.
    pub(crate) fn launch(&mut self, request: &LaunchRequest) -> Result<(), EngineError> {
        let params = serde_json::to_value(request).map_err(|source| EngineError::Protocol {
            operation: "launch",
            source,
        })?;
        self.call("launch", params).map(drop)
    }

    fn call(&mut self, operation: &'static str, params: Value) -> Result<Value, EngineError> {
        let id = self.next_id;
        self.next_id += 1;
        let (reply_tx, reply_rx) = mpsc::channel();
        {
            let mut routing = lock(&self.routing);
            if routing.exited {
                return Err(EngineError::DriverExited);
            }
            routing.pending.insert(id, reply_tx);
        }
        let request = DriverRequest {
            id,
            op: operation,
            params,
        };
        debug!(target: ENGINE_TARGET, id, operation, "driver call");
        if let Err(error) = write_frame(&mut self.stdin, &request) {
            lock(&self.routing).pending.remove(&id);
            return Err(error.into());
        }
        match reply_rx.recv_timeout(self.call_timeout) {
            Ok(reply) => reply.into_result(operation),
            Err(RecvTimeoutError::Timeout) => {
                lock(&self.routing).pending.remove(&id);
                Err(EngineError::Timeout {
                    operation,
                    timeout: self.call_timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::DriverExited),
        }
    }

    fn call_decoded<T: DeserializeOwned>(
        &mut self,
        operation: &'static str,
        params: Value,
    ) -> Result<T, EngineError> {
        let value = self.call(operation, params)?;
        serde_json::from_value(value).map_err(|source| EngineError::Protocol { operation, source })
    }

    fn wait_for_exit(&mut self) {
        let deadline = Instant::now() + EXIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    info!(target: ENGINE_TARGET, %status, "engine driver exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) => {
                    warn!(
                        target: ENGINE_TARGET,
                        grace_ms = EXIT_GRACE.as_millis(),
                        "engine driver ignored shutdown; killing"
                    );
                    terminate(&mut self.child, &self.program);
                    return;
                }
                Err(error) => {
                    warn!(target: ENGINE_TARGET, %error, "failed to poll engine driver");
                    terminate(&mut self.child, &self.program);
                    return;
                }
            }
        }
    }

    fn release(&mut self) {
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            warn!(target: ENGINE_TARGET, "driver reader thread panicked");
        }
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }
}

impl Engine for DriverEngine {
    fn new_page(&mut self) -> Result<PageId, EngineError> {
        self.call_decoded("newPage", json!({}))
    }

    fn goto(&mut self, page: PageId, url: &str) -> Result<(), EngineError> {
        let outcome: NavigationOutcome =
            self.call_decoded("goto", json!({ "page": page, "url": url }))?;
        if outcome.ok {
            Ok(())
        } else {
            Err(EngineError::Navigation {
                url: url.to_owned(),
                status: outcome.status,
            })
        }
    }

    fn content(&mut self, page: PageId) -> Result<String, EngineError> {
        self.call_decoded("content", json!({ "page": page }))
    }

    fn url(&mut self, page: PageId) -> Result<String, EngineError> {
        self.call_decoded("url", json!({ "page": page }))
    }

    fn act(&mut self, page: PageId, instructions: &str) -> Result<ActOutcome, EngineError> {
        self.call_decoded(
            "act",
            json!({ "page": page, "instructions": instructions }),
        )
    }

    fn close_page(&mut self, page: PageId) -> Result<(), EngineError> {
        lock(&self.routing).subscribers.remove(&page);
        self.call("closePage", json!({ "page": page })).map(drop)
    }

    fn add_cookies(&mut self, cookies: &[Cookie]) -> Result<(), EngineError> {
        self.call("addCookies", json!({ "cookies": cookies }))
            .map(drop)
    }

    fn subscribe_network(&mut self, page: PageId) -> Result<Receiver<Value>, EngineError> {
        let (events_tx, events_rx) = mpsc::channel();
        lock(&self.routing).subscribers.insert(page, events_tx);
        if let Err(error) = self.call("subscribeNetwork", json!({ "page": page })) {
            lock(&self.routing).subscribers.remove(&page);
            return Err(error);
        }
        Ok(events_rx)
    }

    fn unsubscribe_network(&mut self, page: PageId) -> Result<(), EngineError> {
        let result = self
            .call("unsubscribeNetwork", json!({ "page": page }))
            .map(drop);
        lock(&self.routing).subscribers.remove(&page);
        result
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        let result = self.call("shutdown", json!({})).map(drop);
        if let Err(error) = &result {
            warn!(target: ENGINE_TARGET, %error, "driver shutdown request failed");
        }
        self.wait_for_exit();
        self.release();
        match result {
            Err(EngineError::DriverExited) => Ok(()),
            other => other,
        }
    }
}

impl Drop for DriverEngine {
    fn drop(&mut self) {
        if !self.shut_down {
            terminate(&mut self.child, &self.program);
            self.release();
        }
    }
}

impl DriverReply {
    fn into_result(self, operation: &'static str) -> Result<Value, EngineError> {
        if self.ok {
            Ok(self.value)
        } else {
            Err(EngineError::failed(
                operation,
                self.error
                    .unwrap_or_else(|| "driver reported an unspecified error".to_owned()),
            ))
        }
    }
}

fn route_driver_output(stdout: ChildStdout, routing: &Mutex<Routing>) {
    let mut reader = FrameReader::new(stdout, MAX_RESPONSE_FRAME_BYTES);
    loop {
        match reader.read_message::<DriverMessage>() {
            Ok(Some(DriverMessage::Reply {
                id,
                ok,
                value,
                error,
            })) => {
                let waiter = lock(routing).pending.remove(&id);
                match waiter {
                    Some(waiter) => {
                        if waiter.send(DriverReply { ok, value, error }).is_err() {
                            debug!(target: ENGINE_TARGET, id, "reply arrived after caller gave up");
                        }
                    }
                    None => debug!(target: ENGINE_TARGET, id, "reply for unknown call"),
                }
            }
            Ok(Some(DriverMessage::Network { page, event })) => {
                let mut routing = lock(routing);
                let delivered = routing
                    .subscribers
                    .get(&page)
                    .is_some_and(|subscriber| subscriber.send(event).is_ok());
                if !delivered {
                    routing.subscribers.remove(&page);
                }
            }
            Ok(None) => break,
            Err(FrameError::Malformed { source }) => {
                warn!(target: ENGINE_TARGET, error = %source, "ignoring malformed driver message");
            }
            Err(error) => {
                warn!(target: ENGINE_TARGET, %error, "driver output failed");
                break;
            }
        }
    }
    let mut routing = lock(routing);
    routing.exited = true;
    routing.pending.clear();
    routing.subscribers.clear();
}

fn lock(routing: &Mutex<Routing>) -> MutexGuard<'_, Routing> {
    routing.lock().unwrap_or_else(PoisonError::into_inner)
}

fn terminate(child: &mut Child, program: &str) {
    if let Err(error) = child.kill() {
        debug!(target: ENGINE_TARGET, program, %error, "kill failed; process already gone");
    }
    if let Err(error) = child.wait() {
        warn!(target: ENGINE_TARGET, program, %error, "failed to reap process");
    }
}
