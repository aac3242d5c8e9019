//! Socket connectivity checks.

use std::io;
use std::path::Path;
use std::time::Duration;

use socket2::{Domain, SockAddr, Socket, Type};

use super::error::LifecycleError;

const SOCKET_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Checks whether a daemon accepts connections on `path`.
pub(super) fn socket_is_reachable(path: &Path) -> Result<bool, LifecycleError> {
    match connect_unix(path) {
        Ok(()) => Ok(true),
        Err(error) if is_socket_available(&error) => Ok(false),
        Err(source) => Err(LifecycleError::SocketCheck {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn connect_unix(path: &Path) -> io::Result<()> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, SOCKET_CONNECT_TIMEOUT)
}

/// Errors meaning nothing listens on the socket.
///
/// Other errors, such as `PermissionDenied`, are reported rather than taken
/// as a stopped daemon.
pub(super) fn is_socket_available(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound | io::ErrorKind::AddrNotAvailable
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;

    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn listening_socket_is_reachable() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("sock");
        let _listener = UnixListener::bind(&path).expect("bind");

        assert!(socket_is_reachable(&path).expect("reachability"));
    }

    #[rstest]
    fn missing_socket_is_not_reachable() {
        let dir = TempDir::new().expect("temp dir");
        assert!(!socket_is_reachable(&dir.path().join("sock")).expect("reachability"));
    }

    #[rstest]
    fn stale_socket_file_is_not_reachable() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("sock");
        drop(UnixListener::bind(&path).expect("bind"));

        assert!(path.exists());
        assert!(!socket_is_reachable(&path).expect("reachability"));
    }

    #[rstest]
    #[case(io::ErrorKind::ConnectionRefused, true)]
    #[case(io::ErrorKind::NotFound, true)]
    #[case(io::ErrorKind::PermissionDenied, false)]
    #[case(io::ErrorKind::TimedOut, false)]
    fn classifies_connect_errors(#[case] kind: io::ErrorKind, #[case] available: bool) {
        assert_eq!(is_socket_available(&io::Error::from(kind)), available);
    }
}
