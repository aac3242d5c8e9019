//! Command-line client for `wb` browser sessions.
//!
//! The runtime parses arguments, loads configuration, makes sure the named
//! session's daemon is running, sends one request over the session socket,
//! and renders the result. Configuration loading, the IO streams, and the
//! daemon binary can all be substituted so tests exercise the same path as the
//! binary.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use wb_config::{SessionName, SessionPaths, split_config_arguments};
use wb_protocol::{Cookie, SessionRequest};

mod cli;
mod command;
mod config;
mod connector;
mod errors;
mod lifecycle;
pub mod output;
#[cfg(test)]
mod tests;

use cli::Cli;
use command::Invocation;
use config::{ConfigLoader, OrthoConfigLoader};
use connector::Connector;
use errors::AppError;
use lifecycle::{LifecycleContext, SessionStatus, SystemLifecycle};
pub use output::{OutputFormat, ResolvedOutputFormat, render};

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E, stdout_is_terminal: bool) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }
}

struct CliRunner<'a, 'io, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'io, W, E>,
    loader: &'a L,
    daemon_binary: Option<&'a OsStr>,
    lifecycle: SystemLifecycle,
}

impl<'a, 'io, W, E, L> CliRunner<'a, 'io, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'io, W, E>, loader: &'a L) -> Self {
        Self {
            io,
            loader,
            daemon_binary: None,
            lifecycle: SystemLifecycle,
        }
    }

    fn with_daemon_binary(mut self, daemon_binary: Option<&'a OsStr>) -> Self {
        self.daemon_binary = daemon_binary;
        self
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli = match Cli::try_parse_from(split.command_arguments(&args)) {
            Ok(cli) => cli,
            Err(error) if !error.use_stderr() => {
                // Help and version output.
                return match write!(self.io.stdout, "{}", error.render()) {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(_) => ExitCode::FAILURE,
                };
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };
        match self.execute(cli, &split.config_arguments) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => self.fail(&error),
        }
    }

    fn execute(&mut self, cli: Cli, config_arguments: &[OsString]) -> Result<(), AppError> {
        let config = self.loader.load(config_arguments)?;
        let format = cli.output.resolve(self.io.stdout_is_terminal());
        let context = LifecycleContext {
            config: &config,
            config_arguments,
            daemon_binary: self.daemon_binary,
        };
        let value = match Invocation::from(cli) {
            Invocation::ListSessions => {
                let sessions = self.lifecycle.list_sessions(&config)?;
                serde_json::to_value(sessions).map_err(AppError::EncodeOutput)?
            }
            Invocation::CreateSession {
                session,
                debug,
                cookies,
            } => self.create_session(context, &session, debug, cookies.as_deref())?,
            Invocation::DeleteSession { session } => {
                self.lifecycle.delete_session(context, &session)?;
                Value::Null
            }
            Invocation::Request { session, request } => {
                self.open_session(context, &session)?.send(&request)?
            }
        };
        output::render(self.io.stdout, &value, format).map_err(AppError::WriteOutput)
    }

    fn create_session(
        &self,
        context: LifecycleContext<'_>,
        session: &SessionName,
        debug: bool,
        cookies: Option<&Path>,
    ) -> Result<Value, AppError> {
        let cookies = cookies.map(read_cookies).transpose()?;
        let paths = retry_once(|| self.ensure_session(context, session, debug))?;
        if let Some(cookies) = cookies {
            Connector::connect(paths.socket_path(), context.config.request_timeout())?
                .send(&SessionRequest::AddCookies { cookies })?;
        }
        let status = SessionStatus {
            name: session.to_string(),
            is_running: true,
        };
        serde_json::to_value(status).map_err(AppError::EncodeOutput)
    }

    /// Connects to the session's daemon, starting it when needed. A failed
    /// start or connection is retried once.
    fn open_session(
        &self,
        context: LifecycleContext<'_>,
        session: &SessionName,
    ) -> Result<Connector, AppError> {
        retry_once(|| {
            let paths = self.ensure_session(context, session, false)?;
            Ok(Connector::connect(
                paths.socket_path(),
                context.config.request_timeout(),
            )?)
        })
    }

    fn ensure_session(
        &self,
        context: LifecycleContext<'_>,
        session: &SessionName,
        debug: bool,
    ) -> Result<SessionPaths, AppError> {
        Ok(self.lifecycle.ensure_session(context, session, debug)?)
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        let _ = writeln!(self.io.stderr, "{error}");
        ExitCode::FAILURE
    }
}

fn retry_once<T>(mut attempt: impl FnMut() -> Result<T, AppError>) -> Result<T, AppError> {
    match attempt() {
        Err(error) if error.is_retryable() => attempt(),
        outcome => outcome,
    }
}

fn read_cookies(path: &Path) -> Result<Vec<Cookie>, AppError> {
    let content = fs::read_to_string(path).map_err(|source| AppError::ReadCookies {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| AppError::ParseCookies {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr, stdout_is_terminal);
    run_with_loader(args, &mut io, &OrthoConfigLoader, None)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
    daemon_binary: Option<&OsStr>,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader)
        .with_daemon_binary(daemon_binary)
        .run(args)
}
