use std::ffi::OsString;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::guard::{ChildCell, TeardownGuard};
use crate::posix;
use crate::status::Outcome;
use crate::supervisor::{LaunchSpec, Supervisor};

/// Executable the worker invokes when none is configured.
pub const DEFAULT_PATH: &str = "/tmp/test";

/// Configuration for a background worker run.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Path of the executable to invoke.
    pub path: OsString,
    /// Arguments passed after `argv[0]`, which is always the path itself.
    pub args: Vec<OsString>,
    /// Environment handed to the child, as ordered `KEY=VALUE` strings.
    pub env: Vec<OsString>,
}

impl Default for WorkerConfig {
    fn default() -> WorkerConfig {
        WorkerConfig {
            path: DEFAULT_PATH.into(),
            args: vec![],
            env: vec![
                "HOME=/".into(),
                "PATH=/sbin:/bin:/usr/sbin:/usr/bin".into(),
            ],
        }
    }
}

impl WorkerConfig {
    fn into_spec(self) -> LaunchSpec {
        let mut spec = LaunchSpec::new(&self.path);
        for arg in self.args {
            spec = spec.arg(arg);
        }
        spec.env(self.env)
    }
}

/// A dedicated background worker that performs one synchronous child
/// invocation.
///
/// This is the supervision protocol for contexts that cannot sit in an
/// interactive wait loop: the worker thread blocks in a single wait until
/// the invoked program completes and receives its final status as a return
/// value, so no intermediate stop or continue transitions are observable.
/// Tearing the worker down kills an outstanding child before joining.
#[derive(Debug)]
pub struct Worker {
    handle: JoinHandle<Result<Outcome>>,
    guard: TeardownGuard,
}

impl Worker {
    /// Start the worker. Fails if the worker thread cannot be created.
    pub fn start(config: WorkerConfig) -> io::Result<Worker> {
        let cell = Arc::new(ChildCell::new());
        let guard = TeardownGuard::new(Arc::clone(&cell));
        let handle = thread::Builder::new()
            .name("childminder-worker".into())
            .spawn(move || run(config, cell))?;
        Ok(Worker { handle, guard })
    }

    /// Pid of the worker's outstanding child, if one is currently running.
    pub fn child_pid(&self) -> Option<u32> {
        self.guard.child()
    }

    /// True once the worker's invocation has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Shut the worker down: forcibly terminate the outstanding child, if
    /// any, then wait for the worker to fully stop and return its result.
    pub fn stop(self) -> Result<Outcome> {
        self.guard.shutdown();
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Spawn(io::Error::other("worker thread panicked"))),
        }
    }
}

fn run(config: WorkerConfig, cell: Arc<ChildCell>) -> Result<Outcome> {
    // A long-lived context may have accumulated custom dispositions; start
    // the invocation from a known-default signal environment.
    if let Err(e) = posix::reset_signal_dispositions() {
        warn!("worker: could not reset signal dispositions: {}", e);
    }

    let spec = config.into_spec();
    info!("worker: invoking {:?}", spec.path());
    let supervisor = Supervisor::single_shot(cell);
    let outcome = supervisor.run(&spec, |report| info!("worker: {}", report))?;
    info!("worker: invocation finished: {}", outcome);
    Ok(outcome)
}
