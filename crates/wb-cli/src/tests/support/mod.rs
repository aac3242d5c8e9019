//! Harness for CLI behavioural coverage.
//!
//! Supplies a configuration rooted in a temporary sessions directory, fake
//! daemons bound to real session sockets, and a world that captures the
//! CLI's output streams and exit code.

mod fake_daemon;

use std::collections::HashMap;
use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use tempfile::TempDir;
use wb_config::{Config, SessionName, SessionPaths};

use crate::config::ConfigLoader;
use crate::errors::AppError;
use crate::{IoStreams, run_with_loader};

pub(crate) use fake_daemon::FakeDaemon;

/// A config loader that returns a fixed configuration for tests.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// CLI state, fake daemons, and captured output for one scenario.
pub(crate) struct TestWorld {
    _root: TempDir,
    pub config: Config,
    pub daemons: HashMap<String, FakeDaemon>,
    pub daemon_binary: Option<OsString>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
}

impl TestWorld {
    pub(crate) fn new() -> Result<Self> {
        let root = TempDir::new().context("sessions root")?;
        let sessions_dir = camino_path(&root)?;
        let config = Config {
            sessions_dir,
            startup_timeout_secs: 2,
            request_timeout_secs: 5,
            ..Config::default()
        };
        Ok(Self {
            _root: root,
            config,
            daemons: HashMap::new(),
            // Never launch a real daemon from tests.
            daemon_binary: Some(OsString::from("/nonexistent/wbd")),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        })
    }

    pub(crate) fn session_paths(&self, name: &str) -> Result<SessionPaths> {
        let name: SessionName = name.parse().context("session name")?;
        Ok(self.config.session_paths(&name))
    }

    /// Starts a fake daemon serving the named session.
    pub(crate) fn start_daemon(&mut self, name: &str) -> Result<&FakeDaemon> {
        let paths = self.session_paths(name)?;
        let daemon = FakeDaemon::serve(&paths)?;
        Ok(self.daemons.entry(name.to_owned()).or_insert(daemon))
    }

    pub(crate) fn daemon(&self, name: &str) -> Result<&FakeDaemon> {
        self.daemons
            .get(name)
            .with_context(|| format!("no fake daemon for session '{name}'"))
    }

    pub(crate) fn run(&mut self, command: &str) {
        let mut args = vec![OsString::from("wb")];
        args.extend(
            command
                .split_whitespace()
                .map(|token| OsString::from(token.trim_matches('"'))),
        );
        self.run_args(args);
    }

    pub(crate) fn run_args(&mut self, args: Vec<OsString>) {
        self.stdout.clear();
        self.stderr.clear();
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut io = IoStreams::new(&mut self.stdout, &mut self.stderr, false);
        let exit = run_with_loader(args, &mut io, &loader, self.daemon_binary.as_deref());
        self.exit_code = Some(exit);
    }

    pub(crate) fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout utf8")
    }

    pub(crate) fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr utf8")
    }

    pub(crate) fn assert_exit(&self, expected: ExitCode) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == expected,
            "expected exit code {expected:?}, got {exit:?}; stderr: {}",
            self.stderr_text()?
        );
        Ok(())
    }
}

fn camino_path(root: &TempDir) -> Result<camino::Utf8PathBuf> {
    camino::Utf8PathBuf::from_path_buf(root.path().join("sessions"))
        .map_err(|path| anyhow::anyhow!("non-UTF-8 temp path {}", path.display()))
}
