//! Supervises daemon launch sequencing and runtime orchestration.

use std::env;
use std::ffi::OsString;
use std::sync::Arc;

use tracing::info;
use wb_config::{Config, SessionName};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::DispatchConnectionHandler;
use crate::engine::{EngineLauncher, LaunchOptions, SystemEngineLauncher};
use crate::health::HealthReporter;
use crate::session::SessionActor;
use crate::transport::{ListenerHandle, SocketListener};

use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{FOREGROUND_ENV_VAR, PROCESS_TARGET};

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal; primarily used for debugging and tests.
    Foreground,
}

impl LaunchMode {
    fn detect() -> Self {
        if env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// What the daemon serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonOptions {
    /// Session owned by this daemon.
    pub session: SessionName,
    /// Show the browser window instead of running headless.
    pub debug: bool,
}

/// Process-level collaborators needed to control daemon lifecycle.
pub(crate) struct ProcessControl<D, S> {
    pub(crate) mode: LaunchMode,
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L, E> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) launcher: E,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, D, S, E> {
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps<L, E>,
}

/// Runs the daemon using the production collaborators.
///
/// `config_arguments` holds the program name followed by any configuration
/// flags.
///
/// # Errors
///
/// Returns an error when the daemon fails to start or shut down cleanly.
pub fn run_daemon(
    options: &DaemonOptions,
    config_arguments: Vec<OsString>,
) -> Result<(), LaunchError> {
    let loader = SystemConfigLoader::new(config_arguments);
    let config = loader.load()?;
    let plan = LaunchPlan {
        process: ProcessControl {
            mode: LaunchMode::detect(),
            daemonizer: SystemDaemonizer::new(),
            shutdown: SystemShutdownSignal::new(),
        },
        services: ServiceDeps {
            launcher: SystemEngineLauncher::from_config(&config),
            loader: StaticConfigLoader::new(config),
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
    };
    run_daemon_with(options, plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, D, S, E>(
    options: &DaemonOptions,
    plan: LaunchPlan<L, D, S, E>,
) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    S: ShutdownSignal,
    E: EngineLauncher,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl {
        mode,
        daemonizer,
        shutdown,
    } = process;

    info!(
        target: PROCESS_TARGET,
        ?mode,
        session = %options.session,
        "starting daemon runtime"
    );
    let config = services.loader.load()?;
    let paths = config.session_paths(&options.session);
    paths.prepare()?;
    let mut guard = ProcessGuard::acquire(paths)?;
    if matches!(mode, LaunchMode::Background) {
        daemonizer.daemonize(guard.paths())?;
    }
    shutdown.listen()?;
    guard.write_pid(std::process::id())?;
    guard.write_health(HealthState::Starting)?;

    let (actor, listener) = match start_services(options, config, &services, &guard, &shutdown) {
        Ok(running) => running,
        Err(error) => {
            guard.mark_failed();
            return Err(error);
        }
    };
    guard.write_health(HealthState::Ready)?;
    info!(
        target: PROCESS_TARGET,
        socket = %guard.paths().socket_path().display(),
        "daemon ready"
    );

    let reason = shutdown.wait()?;
    info!(target: PROCESS_TARGET, %reason, "shutting down");
    guard.write_health(HealthState::Stopping)?;
    listener.shutdown();
    let joined = listener.join();
    actor.shutdown();
    joined?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

fn start_services<L, S, E>(
    options: &DaemonOptions,
    config: Config,
    services: &ServiceDeps<L, E>,
    guard: &ProcessGuard,
    shutdown: &S,
) -> Result<(SessionActor, ListenerHandle), LaunchError>
where
    S: ShutdownSignal,
    E: EngineLauncher,
{
    let launch = LaunchOptions {
        browser: config.browser(),
        headless: !options.debug,
        data_dir: guard.paths().data_dir().to_path_buf(),
    };
    let static_loader = StaticConfigLoader::new(config);
    let daemon = bootstrap_with(
        &static_loader,
        Arc::clone(&services.reporter),
        &services.launcher,
        &launch,
    )?;
    let actor = SessionActor::spawn(daemon.into_session())
        .map_err(|source| LaunchError::SessionThread { source })?;
    let handler = Arc::new(DispatchConnectionHandler::new(
        actor.handle(),
        shutdown.trigger(),
    ));
    let listener = SocketListener::bind(guard.paths().socket_path())?;
    let handle = listener.start(handler)?;
    Ok((actor, handle))
}
