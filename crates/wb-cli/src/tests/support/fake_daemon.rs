//! Fake session daemon for behavioural tests.
//!
//! Listens on a session's real socket path and answers each request from a
//! script keyed by method name, so the CLI finds it exactly where it would
//! find `wbd`. `deleteSession` is acknowledged and then the daemon stops and
//! removes its socket.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use wb_config::SessionPaths;
use wb_protocol::{Request, Response};

const ACCEPT_POLL: Duration = Duration::from_millis(10);

type Script = Arc<Mutex<HashMap<String, Response>>>;

pub(crate) struct FakeDaemon {
    socket: PathBuf,
    script: Script,
    requests: Arc<Mutex<Vec<Request>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeDaemon {
    /// Binds the session socket and starts answering requests.
    pub(crate) fn serve(paths: &SessionPaths) -> Result<Self> {
        paths.prepare().context("prepare session directory")?;
        let listener = UnixListener::bind(paths.socket_path()).context("bind fake daemon")?;
        listener
            .set_nonblocking(true)
            .context("fake daemon nonblocking")?;
        let script: Script = Arc::default();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let socket = paths.socket_path().to_path_buf();
            let script = Arc::clone(&script);
            let requests = Arc::clone(&requests);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                accept_loop(&listener, &script, &requests, &stop);
                drop(listener);
                let _ = fs::remove_file(socket);
            })
        };
        Ok(Self {
            socket: paths.socket_path().to_path_buf(),
            script,
            requests,
            stop,
            handle: Some(handle),
        })
    }

    /// Answers `method` with `response` from now on.
    pub(crate) fn answer(&self, method: &str, response: Response) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.to_owned(), response);
    }

    /// Requests received so far, in arrival order.
    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Methods received so far, in arrival order.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.method)
            .collect()
    }

    pub(crate) fn socket(&self) -> &PathBuf {
        &self.socket
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop(
    listener: &UnixListener,
    script: &Script,
    requests: &Arc<Mutex<Vec<Request>>>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => match serve_connection(stream, script, requests) {
                Ok(Served::Deleted) => return,
                Ok(Served::Closed) | Err(_) => {}
            },
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(_) => return,
        }
    }
}

enum Served {
    Closed,
    Deleted,
}

fn serve_connection(
    stream: UnixStream,
    script: &Script,
    requests: &Arc<Mutex<Vec<Request>>>,
) -> io::Result<Served> {
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(Served::Closed);
        }
        let request: Request = serde_json::from_str(&line)?;
        let deleting = request.method == "deleteSession";
        let response = script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.method)
            .cloned()
            .unwrap_or_else(|| Response::success(Value::Null));
        requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        if deleting {
            return Ok(Served::Deleted);
        }
    }
}
