//! Connection handler that serves session requests.

use serde::Serialize;
use tracing::{debug, warn};
use wb_protocol::{
    FrameError, FrameReader, MAX_REQUEST_FRAME_BYTES, Request, Response, SessionRequest,
    write_frame,
};

use super::DISPATCH_TARGET;
use crate::process::{ShutdownReason, ShutdownTrigger};
use crate::session::SessionHandle;
use crate::transport::{ConnectionHandler, ConnectionStream};

/// Serves framed requests until the client closes the connection.
///
/// A successful `deleteSession` is acknowledged first; the handler then asks
/// the daemon to shut down and closes the connection.
#[derive(Debug)]
pub(crate) struct DispatchConnectionHandler {
    session: SessionHandle,
    shutdown: ShutdownTrigger,
}

enum Outcome {
    Continue,
    SessionDeleted,
}

impl DispatchConnectionHandler {
    pub(crate) const fn new(session: SessionHandle, shutdown: ShutdownTrigger) -> Self {
        Self { session, shutdown }
    }

    fn serve(&self, stream: ConnectionStream) {
        let mut reader = FrameReader::new(stream, MAX_REQUEST_FRAME_BYTES);
        loop {
            let request = match reader.read_message::<Request>() {
                Ok(Some(request)) => request,
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, "client closed connection");
                    return;
                }
                Err(FrameError::Malformed { source }) => {
                    warn!(target: DISPATCH_TARGET, error = %source, "malformed request");
                    let response = Response::failure(format!("malformed request: {source}"));
                    if !reply(reader.get_mut(), &response) {
                        return;
                    }
                    continue;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                    reply(reader.get_mut(), &Response::failure(&error));
                    return;
                }
            };
            let (response, outcome) = self.answer(&request);
            if !reply(reader.get_mut(), &response) {
                return;
            }
            if matches!(outcome, Outcome::SessionDeleted) {
                self.shutdown.request(ShutdownReason::SessionDeleted);
                return;
            }
        }
    }

    fn answer(&self, request: &Request) -> (Response, Outcome) {
        let validated = match SessionRequest::from_wire(request) {
            Ok(validated) => validated,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "invalid request");
                return (Response::failure(error), Outcome::Continue);
            }
        };
        let method = validated.method();
        let deleting = matches!(validated, SessionRequest::DeleteSession);
        match self.session.execute(validated) {
            Ok(result) => {
                debug!(target: DISPATCH_TARGET, %method, "request succeeded");
                let outcome = if deleting {
                    Outcome::SessionDeleted
                } else {
                    Outcome::Continue
                };
                (Response::success(result), outcome)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %method, %error, "request failed");
                (Response::failure(error), Outcome::Continue)
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

fn reply<T: Serialize>(stream: &mut ConnectionStream, message: &T) -> bool {
    match write_frame(stream, message) {
        Ok(()) => true,
        Err(error) => {
            debug!(target: DISPATCH_TARGET, %error, "failed to write response");
            false
        }
    }
}
