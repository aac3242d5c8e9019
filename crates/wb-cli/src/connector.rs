//! Request/response exchange with a session daemon.
//!
//! A [`Connector`] owns one connection. Each call writes a single request
//! frame and waits, with a deadline, for exactly the next frame. Giving up on
//! a response does not cancel the work on the daemon side.

use std::io;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use wb_protocol::{
    FrameError, FrameReader, MAX_RESPONSE_FRAME_BYTES, Response, SessionMethod, SessionRequest,
    write_frame,
};

const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Errors raised while talking to a daemon.
#[derive(Debug, Error)]
pub(crate) enum ConnectorError {
    #[error("failed to connect to session socket {path:?}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure session connection: {source}")]
    Configure {
        #[source]
        source: io::Error,
    },
    #[error("failed to send {method} request: {source}")]
    Send {
        method: SessionMethod,
        #[source]
        source: FrameError,
    },
    #[error("failed to read {method} response: {source}")]
    Receive {
        method: SessionMethod,
        #[source]
        source: FrameError,
    },
    #[error("timed out after {timeout_ms} ms waiting for the {method} response")]
    Timeout { method: SessionMethod, timeout_ms: u128 },
    #[error("daemon closed the connection before answering {method}")]
    Closed { method: SessionMethod },
    #[error("{message}")]
    Daemon { message: String },
}

impl ConnectorError {
    /// Whether connecting failed because nothing is listening.
    pub(crate) fn is_daemon_not_running(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }

    /// Whether the request went out but no answer came back.
    pub(crate) const fn is_unanswered(&self) -> bool {
        matches!(
            self,
            Self::Send { .. } | Self::Receive { .. } | Self::Timeout { .. } | Self::Closed { .. }
        )
    }
}

/// One open connection to a session daemon.
#[derive(Debug)]
pub(crate) struct Connector {
    reader: FrameReader<UnixStream>,
    timeout: Duration,
}

impl Connector {
    /// Connects to the daemon listening on `socket`.
    pub(crate) fn connect(socket: &Path, timeout: Duration) -> Result<Self, ConnectorError> {
        let stream = UnixStream::connect(socket).map_err(|source| ConnectorError::Connect {
            path: socket.to_path_buf(),
            source,
        })?;
        Ok(Self {
            reader: FrameReader::new(stream, MAX_RESPONSE_FRAME_BYTES),
            timeout: timeout.max(MIN_TIMEOUT),
        })
    }

    /// Sends `request` and returns its result, waiting up to the request
    /// timeout.
    pub(crate) fn send(&mut self, request: &SessionRequest) -> Result<Value, ConnectorError> {
        self.send_within(request, self.timeout)
    }

    /// Asks the daemon to delete its session and waits up to `ack_timeout`
    /// for the acknowledgement. The daemon shuts down after replying.
    pub(crate) fn delete_session(mut self, ack_timeout: Duration) -> Result<(), ConnectorError> {
        self.send_within(&SessionRequest::DeleteSession, ack_timeout)
            .map(drop)
    }

    fn send_within(
        &mut self,
        request: &SessionRequest,
        timeout: Duration,
    ) -> Result<Value, ConnectorError> {
        let method = request.method();
        let timeout = timeout.max(MIN_TIMEOUT);
        let stream = self.reader.get_mut();
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|source| ConnectorError::Configure { source })?;
        write_frame(stream, &request.to_wire())
            .map_err(|source| ConnectorError::Send { method, source })?;
        let response = match self.reader.read_message::<Response>() {
            Ok(Some(response)) => response,
            Ok(None) => return Err(ConnectorError::Closed { method }),
            Err(error) if error.is_timeout() => {
                return Err(ConnectorError::Timeout {
                    method,
                    timeout_ms: timeout.as_millis(),
                });
            }
            Err(source) => return Err(ConnectorError::Receive { method, source }),
        };
        response
            .into_result()
            .map_err(|message| ConnectorError::Daemon { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixListener;
    use std::thread;

    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::TempDir;

    struct Socket {
        _dir: TempDir,
        path: PathBuf,
    }

    #[fixture]
    fn socket() -> Socket {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("sock");
        Socket { _dir: dir, path }
    }

    /// Serves one connection, answering each request line with the next reply.
    fn serve(listener: UnixListener, replies: Vec<&'static str>) -> thread::JoinHandle<Vec<Value>> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut writer = stream;
            let mut seen = Vec::new();
            for reply in replies {
                let mut line = String::new();
                if reader.read_line(&mut line).expect("read") == 0 {
                    break;
                }
                seen.push(serde_json::from_str(&line).expect("request json"));
                writer.write_all(reply.as_bytes()).expect("write");
                writer.write_all(b"\n").expect("newline");
            }
            seen
        })
    }

    #[rstest]
    fn sends_requests_in_order_on_one_connection(socket: Socket) {
        let listener = UnixListener::bind(&socket.path).expect("bind");
        let server = serve(listener, vec![r#"{"result":["a"]}"#, r#"{"result":null}"#]);
        let mut connector = Connector::connect(&socket.path, Duration::from_secs(5)).expect("connect");

        let tabs = connector.send(&SessionRequest::ListTabs).expect("listTabs");
        let go = connector
            .send(&SessionRequest::Go {
                url: "https://example.org/".to_owned(),
            })
            .expect("go");

        assert_eq!(tabs, json!(["a"]));
        assert_eq!(go, Value::Null);
        let seen = server.join().expect("server");
        assert_eq!(seen[0], json!({"method": "listTabs", "params": {}}));
        assert_eq!(
            seen[1],
            json!({"method": "go", "params": {"url": "https://example.org/"}})
        );
    }

    #[rstest]
    fn error_responses_surface_the_message(socket: Socket) {
        let listener = UnixListener::bind(&socket.path).expect("bind");
        let server = serve(listener, vec![r#"{"error":"no current tab set"}"#]);
        let mut connector = Connector::connect(&socket.path, Duration::from_secs(5)).expect("connect");

        let error = connector
            .send(&SessionRequest::GetCurrentTab)
            .expect_err("failure");

        assert_eq!(error.to_string(), "no current tab set");
        server.join().expect("server");
    }

    #[rstest]
    fn silent_daemon_times_out(socket: Socket) {
        let listener = UnixListener::bind(&socket.path).expect("bind");
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(&stream);
            let mut line = String::new();
            reader.read_line(&mut line).expect("read");
            // Hold the connection open until the client hangs up.
            while reader.read_line(&mut line).unwrap_or(0) > 0 {}
        });
        let mut connector =
            Connector::connect(&socket.path, Duration::from_millis(100)).expect("connect");

        let error = connector
            .send(&SessionRequest::RuntimeSeconds)
            .expect_err("timeout");

        assert!(matches!(
            error,
            ConnectorError::Timeout {
                method: SessionMethod::RuntimeSeconds,
                ..
            }
        ));
        drop(connector);
        server.join().expect("server");
    }

    #[rstest]
    fn closed_connection_is_reported(socket: Socket) {
        let listener = UnixListener::bind(&socket.path).expect("bind");
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut line = String::new();
            BufReader::new(&stream).read_line(&mut line).expect("read");
        });
        let mut connector = Connector::connect(&socket.path, Duration::from_secs(5)).expect("connect");

        let error = connector.send(&SessionRequest::ListTabs).expect_err("closed");

        assert!(matches!(error, ConnectorError::Closed { .. }));
        server.join().expect("server");
    }

    #[rstest]
    fn missing_socket_means_not_running(socket: Socket) {
        let error = Connector::connect(&socket.path, Duration::from_secs(1)).expect_err("absent");
        assert!(error.is_daemon_not_running());
    }
}
