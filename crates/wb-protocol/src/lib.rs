//! Wire protocol shared by the `wb` client and the `wbd` daemon.
//!
//! Messages are JSON documents framed one per line. A client sends a
//! [`Request`] naming one of the [`SessionMethod`] values and receives exactly
//! one [`Response`] on the same connection before it may send the next
//! request. [`SessionRequest`] is the validated, typed form of a request and
//! is what both sides work with; the daemon builds it through
//! [`SessionRequest::from_wire`] before touching any session state.

mod frame;
mod message;
mod method;
mod model;
mod request;

pub use frame::{
    FrameDecoder, FrameError, FrameReader, MAX_REQUEST_FRAME_BYTES, MAX_RESPONSE_FRAME_BYTES,
    decode, encode, write_frame,
};
pub use message::{Request, Response};
pub use method::{SessionMethod, UnknownMethod};
pub use model::{
    Action, Cookie, CurrentTab, Headers, InteractResult, NetworkEvent, SameSite, Tab,
    unix_millis,
};
pub use request::{DUMP_WINDOW_CHARS, SessionRequest, ValidationError};
