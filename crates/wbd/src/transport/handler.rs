//! Connection handling abstractions for the daemon listener.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;

/// Stream accepted by the daemon listener.
#[derive(Debug)]
pub(crate) struct ConnectionStream(UnixStream);

impl ConnectionStream {
    pub(crate) const fn new(stream: UnixStream) -> Self {
        Self(stream)
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection until the client closes it. Implementations
    /// should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}
