use std::ffi::OsString;

use tempfile::TempDir;

use super::wait_until;
use crate::{DEFAULT_PATH, Error, Outcome, Worker, WorkerConfig};

fn shell_config(script: &str) -> WorkerConfig {
    WorkerConfig {
        path: "/bin/sh".into(),
        args: vec!["-c".into(), script.into()],
        ..WorkerConfig::default()
    }
}

#[test]
fn default_config_matches_documented_values() {
    let config = WorkerConfig::default();
    assert_eq!(config.path, DEFAULT_PATH);
    assert_eq!(config.path, "/tmp/test");
    assert!(config.args.is_empty());
    assert_eq!(
        config.env,
        ["HOME=/", "PATH=/sbin:/bin:/usr/sbin:/usr/bin"]
            .map(OsString::from)
            .to_vec()
    );
}

#[test]
fn worker_reports_the_final_exit_status() {
    let worker = Worker::start(shell_config("exit 5")).unwrap();
    wait_until("worker to finish", || worker.is_finished());
    assert_eq!(worker.stop().unwrap(), Outcome::Exited { code: 5 });
}

#[test]
fn worker_surfaces_a_missing_executable() {
    let tmpdir = TempDir::new().unwrap();
    let config = WorkerConfig {
        path: tmpdir.path().join("absent").into_os_string(),
        ..WorkerConfig::default()
    };
    let worker = Worker::start(config).unwrap();
    wait_until("worker to finish", || worker.is_finished());
    assert!(matches!(worker.stop(), Err(Error::NotFound(_))));
}

#[test]
fn stopping_the_worker_kills_a_long_running_child() {
    let worker = Worker::start(shell_config("sleep 30")).unwrap();
    wait_until("child to be registered", || worker.child_pid().is_some());

    let outcome = worker.stop().unwrap();
    assert_eq!(
        outcome,
        Outcome::Signaled {
            signal: libc::SIGKILL,
            core_dumped: false
        }
    );
}

#[test]
fn stop_after_natural_completion_does_not_error() {
    let worker = Worker::start(shell_config("exit 0")).unwrap();
    wait_until("worker to finish", || worker.is_finished());
    assert_eq!(worker.child_pid(), None);
    assert_eq!(worker.stop().unwrap(), Outcome::Exited { code: 0 });
}
