//! Supervision of the lightpanda CDP server.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{ENGINE_TARGET, EngineError};

/// Port lightpanda listens on.
pub const LIGHTPANDA_PORT: u16 = 9222;

/// CDP endpoint handed to the driver when lightpanda is selected.
pub const LIGHTPANDA_CDP_URL: &str = "ws://127.0.0.1:9222";

const CONNECT_POLL: Duration = Duration::from_millis(100);
const CONNECT_ATTEMPT: Duration = Duration::from_millis(250);

/// A running `lightpanda serve` process. Stopped on drop.
#[derive(Debug)]
pub struct LightpandaServer {
    program: String,
    child: Option<Child>,
}

impl LightpandaServer {
    /// Starts the server and waits until it accepts TCP connections.
    ///
    /// # Errors
    ///
    /// Fails when the program cannot be spawned, exits early, or is not
    /// listening before `startup_timeout` elapses.
    pub fn start(program: &str, startup_timeout: Duration) -> Result<Self, EngineError> {
        let child = Command::new(program)
            .args(["serve", "--host", "127.0.0.1", "--port"])
            .arg(LIGHTPANDA_PORT.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: program.to_owned(),
                source,
            })?;
        let mut server = Self {
            program: program.to_owned(),
            child: Some(child),
        };
        server.wait_until_listening(startup_timeout)?;
        info!(
            target: ENGINE_TARGET,
            program,
            port = LIGHTPANDA_PORT,
            "lightpanda server ready"
        );
        Ok(server)
    }

    fn wait_until_listening(&mut self, startup_timeout: Duration) -> Result<(), EngineError> {
        let address = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, LIGHTPANDA_PORT));
        let deadline = Instant::now() + startup_timeout;
        loop {
            if let Some(child) = self.child.as_mut() {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        self.child = None;
                        return Err(EngineError::ServerExited {
                            program: self.program.clone(),
                            status: status.to_string(),
                        });
                    }
                    Ok(None) => {}
                    Err(source) => {
                        self.stop();
                        return Err(EngineError::Supervise {
                            program: self.program.clone(),
                            source,
                        });
                    }
                }
            }
            if TcpStream::connect_timeout(&address, CONNECT_ATTEMPT).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                self.stop();
                return Err(EngineError::ServerTimeout {
                    program: self.program.clone(),
                    timeout: startup_timeout,
                });
            }
            thread::sleep(CONNECT_POLL);
        }
    }

    /// Kills the server and reaps it. Safe to call more than once.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(error) = child.kill() {
            debug!(target: ENGINE_TARGET, %error, "lightpanda already exited");
        }
        match child.wait() {
            Ok(status) => debug!(target: ENGINE_TARGET, %status, "lightpanda server stopped"),
            Err(error) => warn!(target: ENGINE_TARGET, %error, "failed to reap lightpanda server"),
        }
    }
}

impl Drop for LightpandaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_fails_to_spawn() {
        let error = LightpandaServer::start("wb-lightpanda-missing", Duration::from_millis(200))
            .expect_err("spawn should fail");
        assert!(matches!(error, EngineError::Spawn { .. }));
    }

    #[test]
    fn early_exit_is_reported() {
        let error = LightpandaServer::start("false", Duration::from_secs(2))
            .expect_err("server exits immediately");
        assert!(
            matches!(
                error,
                EngineError::ServerExited { .. } | EngineError::ServerTimeout { .. }
            ),
            "unexpected error: {error}"
        );
    }
}
