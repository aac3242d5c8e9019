//! Behavioural tests for the daemon bootstrap sequence.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use wb_config::BrowserKind;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::engine::LaunchOptions;

use super::support::{
    FailingConfigLoader, FakeEngineLauncher, HealthEvent, RecordingHealthReporter,
    TestConfigLoader,
};

struct BootstrapWorld {
    loader: Box<dyn ConfigLoader>,
    launcher: FakeEngineLauncher,
    reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Result<Daemon, BootstrapError>>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            launcher: FakeEngineLauncher::default(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
        }
    }

    fn options() -> LaunchOptions {
        LaunchOptions {
            browser: BrowserKind::Chrome,
            headless: true,
            data_dir: PathBuf::from("/tmp/wb-bootstrap-test/data"),
        }
    }
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(TestConfigLoader::new());
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(FailingConfigLoader);
}

#[given("an engine launcher that succeeds")]
fn given_launcher_succeeds(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().launcher = FakeEngineLauncher::default();
}

#[given("an engine launcher that fails")]
fn given_launcher_fails(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().launcher = FakeEngineLauncher::failing();
}

#[when("the daemon bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    let mut world = world.borrow_mut();
    let outcome = bootstrap_with(
        world.loader.as_ref(),
        Arc::clone(&world.reporter) as Arc<dyn crate::health::HealthReporter>,
        &world.launcher,
        &BootstrapWorld::options(),
    );
    world.outcome = Some(outcome);
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let outcome = world.outcome.as_ref().expect("bootstrap ran");
    assert!(outcome.is_ok(), "bootstrap failed: {outcome:?}");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let outcome = world.outcome.as_ref().expect("bootstrap ran");
    assert!(outcome.is_err(), "bootstrap succeeded unexpectedly");
    assert!(matches!(
        world.reporter.events().last(),
        Some(HealthEvent::BootstrapFailed(_))
    ));
}

#[then("the engine was launched headless")]
fn then_engine_headless(world: &RefCell<BootstrapWorld>) {
    let launches = world.borrow().launcher.launches();
    assert_eq!(launches.len(), 1);
    assert!(launches.iter().all(|options| options.headless));
}

#[then("no engine was launched")]
fn then_no_engine(world: &RefCell<BootstrapWorld>) {
    assert!(world.borrow().launcher.launches().is_empty());
}

#[then("the health events end with the engine ready")]
fn then_engine_ready(world: &RefCell<BootstrapWorld>) {
    assert_eq!(
        world.borrow().reporter.events(),
        vec![
            HealthEvent::BootstrapStarting,
            HealthEvent::BootstrapSucceeded,
            HealthEvent::EngineStarting(BrowserKind::Chrome),
            HealthEvent::EngineReady(BrowserKind::Chrome),
        ]
    );
}

#[then("the engine failure was reported")]
fn then_engine_failure_reported(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    assert!(
        events.iter().any(|event| matches!(
            event,
            HealthEvent::EngineFailed { browser: BrowserKind::Chrome, message }
                if message.contains("wb-driver")
        )),
        "{events:?}"
    );
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Bootstrap launches the engine once configuration is loaded"
)]
fn bootstrap_launches_engine(world: RefCell<BootstrapWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Configuration failures stop bootstrap before the engine starts"
)]
fn configuration_failure(world: RefCell<BootstrapWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Engine launch failure is fatal"
)]
fn engine_failure(world: RefCell<BootstrapWorld>) {
    drop(world);
}
