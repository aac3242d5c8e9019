//! Tests for daemon readiness monitoring.

use std::fs;
use std::os::unix::net::UnixListener;
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;
use wb_config::{SessionName, SessionPaths};

use super::error::LifecycleError;
use super::monitoring::{
    DaemonStatus, HealthCheckOutcome, HealthSnapshot, ProcessMonitorContext, check_health_snapshot,
    read_pid, snapshot_is_recent, wait_for_ready,
};
use super::utils::open_session_dir;

struct SessionFixture {
    _root: TempDir,
    paths: SessionPaths,
}

#[fixture]
fn session() -> SessionFixture {
    let root = TempDir::new().expect("temp dir");
    let paths = SessionPaths::new(root.path(), &SessionName::default());
    paths.prepare().expect("prepare");
    SessionFixture { _root: root, paths }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs()
}

fn write_health(paths: &SessionPaths, status: &str, pid: u32, timestamp: u64) {
    let snapshot = json!({"status": status, "pid": pid, "timestamp": timestamp});
    fs::write(paths.health_path(), snapshot.to_string()).expect("write health");
}

fn monitor(pid: u32, daemonized: bool) -> ProcessMonitorContext {
    ProcessMonitorContext {
        started_at: SystemTime::now(),
        expected_pid: pid,
        daemonized,
    }
}

#[rstest]
fn missing_snapshot_keeps_polling(session: SessionFixture) {
    let dir = open_session_dir(&session.paths).expect("dir");
    let outcome = check_health_snapshot(&dir, &session.paths, monitor(7, false)).expect("check");
    assert_eq!(outcome, HealthCheckOutcome::Continue);
}

#[rstest]
fn ready_needs_a_reachable_socket(session: SessionFixture) {
    write_health(&session.paths, "ready", 7, now_secs() + 60);
    let dir = open_session_dir(&session.paths).expect("dir");

    let before = check_health_snapshot(&dir, &session.paths, monitor(7, false)).expect("check");
    let _listener = UnixListener::bind(session.paths.socket_path()).expect("bind");
    let after = check_health_snapshot(&dir, &session.paths, monitor(7, false)).expect("check");

    assert_eq!(before, HealthCheckOutcome::Continue);
    assert_eq!(after, HealthCheckOutcome::Ready);
}

#[rstest]
fn snapshots_from_other_processes_are_ignored_until_daemonized(session: SessionFixture) {
    write_health(&session.paths, "failed", 99, now_secs() + 60);
    let dir = open_session_dir(&session.paths).expect("dir");

    let foreign = check_health_snapshot(&dir, &session.paths, monitor(7, false)).expect("check");
    let forked = check_health_snapshot(&dir, &session.paths, monitor(7, true)).expect("check");

    assert_eq!(foreign, HealthCheckOutcome::Continue);
    assert_eq!(forked, HealthCheckOutcome::Aborted(DaemonStatus::Failed));
}

#[rstest]
fn stale_snapshots_are_ignored(session: SessionFixture) {
    write_health(&session.paths, "stopping", 7, now_secs() - 3600);
    let dir = open_session_dir(&session.paths).expect("dir");
    let outcome = check_health_snapshot(&dir, &session.paths, monitor(7, true)).expect("check");
    assert_eq!(outcome, HealthCheckOutcome::Continue);
}

#[rstest]
fn recent_means_same_second_or_later() {
    let started_at = UNIX_EPOCH + Duration::from_millis(10_900);
    let snapshot = |timestamp| HealthSnapshot {
        status: DaemonStatus::Ready,
        pid: 1,
        timestamp,
    };
    assert!(snapshot_is_recent(&snapshot(10), started_at).expect("clock"));
    assert!(!snapshot_is_recent(&snapshot(9), started_at).expect("clock"));
}

#[rstest]
#[case::absent(None, None)]
#[case::empty(Some(""), None)]
#[case::value(Some("42\n"), Some(42))]
fn pid_file_contents(
    session: SessionFixture,
    #[case] content: Option<&str>,
    #[case] expected: Option<u32>,
) {
    if let Some(content) = content {
        fs::write(session.paths.pid_path(), content).expect("write pid");
    }
    let dir = open_session_dir(&session.paths).expect("dir");
    assert_eq!(read_pid(&dir, &session.paths).expect("read"), expected);
}

#[rstest]
fn garbage_pid_is_an_error(session: SessionFixture) {
    fs::write(session.paths.pid_path(), "abc").expect("write pid");
    let dir = open_session_dir(&session.paths).expect("dir");
    assert!(matches!(
        read_pid(&dir, &session.paths),
        Err(LifecycleError::ParsePid { .. })
    ));
}

#[rstest]
fn failed_launch_reports_the_log_tail(session: SessionFixture) {
    fs::write(session.paths.log_path(), "wbd: engine refused to start\n").expect("write log");
    let mut child = Command::new("sh")
        .args(["-c", "exit 3"])
        .spawn()
        .expect("spawn");

    let error = wait_for_ready(
        &session.paths,
        &SessionName::default(),
        &mut child,
        SystemTime::now(),
        Duration::from_secs(5),
    )
    .expect_err("launch fails");

    assert!(matches!(
        error,
        LifecycleError::StartupFailed {
            exit_status: Some(3),
            ..
        }
    ));
    assert!(error.to_string().contains("engine refused to start"));
}

#[rstest]
fn failed_launch_with_a_live_socket_counts_as_ready(session: SessionFixture) {
    let _listener = UnixListener::bind(session.paths.socket_path()).expect("bind");
    let mut child = Command::new("sh")
        .args(["-c", "exit 1"])
        .spawn()
        .expect("spawn");

    wait_for_ready(
        &session.paths,
        &SessionName::default(),
        &mut child,
        SystemTime::now(),
        Duration::from_secs(5),
    )
    .expect("another daemon serves the session");
}

#[rstest]
fn daemonized_launch_waits_for_ready(session: SessionFixture) {
    let started_at = SystemTime::now();
    write_health(&session.paths, "ready", 4242, now_secs());
    let _listener = UnixListener::bind(session.paths.socket_path()).expect("bind");
    let mut child = Command::new("true").spawn().expect("spawn");

    wait_for_ready(
        &session.paths,
        &SessionName::default(),
        &mut child,
        started_at,
        Duration::from_secs(5),
    )
    .expect("ready");
}

#[rstest]
fn silent_daemon_times_out(session: SessionFixture) {
    let mut child = Command::new("sleep").arg("5").spawn().expect("spawn");

    let error = wait_for_ready(
        &session.paths,
        &SessionName::default(),
        &mut child,
        SystemTime::now(),
        Duration::from_millis(300),
    )
    .expect_err("timeout");

    child.kill().expect("kill");
    child.wait().expect("reap");
    assert!(matches!(error, LifecycleError::SpawnTimeout { .. }));
}
