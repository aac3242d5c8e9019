//! Request dispatch for session connections.
//!
//! A connection carries any number of sequential requests. Each frame is
//! decoded into a [`Request`](wb_protocol::Request), validated into a
//! [`SessionRequest`](wb_protocol::SessionRequest), and executed on the
//! session actor. The reply is written before the next frame is read.
//!
//! ```json
//! {"method":"newTab","params":{"tabName":"a","url":"https://example.com"}}
//! ```
//!
//! ```json
//! {"result":{"url":"https://example.com/","actions":[],"startTime":1718000000000}}
//! ```
//!
//! Invalid requests and failed operations are answered with `{"error": ...}`
//! and leave the connection open.

mod handler;
mod router;

pub(crate) use self::handler::DispatchConnectionHandler;
pub(crate) use self::router::{DISPATCH_TARGET, route};
