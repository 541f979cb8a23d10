use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::guard::ChildCell;
use crate::posix;
use crate::resolve;
use crate::signals;
use crate::status::{Outcome, WaitStatus};

/// What to launch: executable path, argument list, environment, and
/// optional working directory. Immutable once constructed; owned by the
/// supervisor for the duration of one launch.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    path: OsString,
    argv: Vec<OsString>,
    env: Option<Vec<OsString>>,
    cwd: Option<PathBuf>,
}

impl LaunchSpec {
    /// A spec for `path` with `argv` equal to `[path]`, inheriting the
    /// supervisor's environment.
    pub fn new(path: impl AsRef<OsStr>) -> LaunchSpec {
        let path = path.as_ref().to_owned();
        LaunchSpec {
            argv: vec![path.clone()],
            path,
            env: None,
            cwd: None,
        }
    }

    /// Build a spec from a full argument vector, taking the executable path
    /// from its first element. Returns `None` for an empty vector.
    pub fn from_argv(argv: impl IntoIterator<Item = OsString>) -> Option<LaunchSpec> {
        let argv: Vec<OsString> = argv.into_iter().collect();
        let path = argv.first()?.clone();
        Some(LaunchSpec {
            path,
            argv,
            env: None,
            cwd: None,
        })
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> LaunchSpec {
        self.argv.push(arg.as_ref().to_owned());
        self
    }

    /// Give the child this exact environment, an ordered list of
    /// `KEY=VALUE` strings, instead of inheriting the supervisor's.
    pub fn env(mut self, env: Vec<OsString>) -> LaunchSpec {
        self.env = Some(env);
        self
    }

    /// Run the child in `dir` instead of the supervisor's working
    /// directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> LaunchSpec {
        self.cwd = Some(dir.into());
        self
    }

    pub fn path(&self) -> &OsStr {
        &self.path
    }
}

/// Structured record of one observed child state transition, handed to the
/// reporting sink. Formatting it for humans is the sink's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub kind: ReportKind,
    pub code_or_signal: i32,
    pub signal_name: &'static str,
    pub core_dumped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Exited,
    Signaled,
    Stopped,
    Continued,
}

impl Report {
    /// The report for a decoded outcome. `Unknown` outcomes are not
    /// reportable; the supervisor logs them and keeps waiting.
    pub fn from_outcome(outcome: &Outcome) -> Option<Report> {
        let report = match *outcome {
            Outcome::Exited { code } => Report {
                kind: ReportKind::Exited,
                code_or_signal: code as i32,
                signal_name: "",
                core_dumped: false,
            },
            Outcome::Signaled {
                signal,
                core_dumped,
            } => Report {
                kind: ReportKind::Signaled,
                code_or_signal: signal,
                signal_name: signals::name_of(signal),
                core_dumped,
            },
            Outcome::Stopped { signal } => Report {
                kind: ReportKind::Stopped,
                code_or_signal: signal,
                signal_name: signals::name_of(signal),
                core_dumped: false,
            },
            Outcome::Continued => Report {
                kind: ReportKind::Continued,
                code_or_signal: 0,
                signal_name: "",
                core_dumped: false,
            },
            Outcome::Unknown(_) => return None,
        };
        Some(report)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReportKind::Exited => {
                write!(f, "child exited with code {}", self.code_or_signal)
            }
            ReportKind::Signaled => {
                write!(
                    f,
                    "child terminated by signal {} ({})",
                    self.code_or_signal, self.signal_name
                )?;
                if self.core_dumped {
                    write!(f, ", core dumped")?;
                }
                Ok(())
            }
            ReportKind::Stopped => {
                write!(
                    f,
                    "child stopped by signal {} ({})",
                    self.code_or_signal, self.signal_name
                )
            }
            ReportKind::Continued => write!(f, "child continued"),
        }
    }
}

/// Blocking wait and resume primitives for one supervised child.
///
/// The real implementation is [`Child`], which wraps `waitpid(2)` and
/// `kill(2)`; tests substitute scripted status sequences to exercise the
/// supervision loop without real processes.
pub trait Wait {
    /// Block until the child's state changes and return the raw status
    /// word.
    fn wait(&mut self) -> Result<WaitStatus>;

    /// Deliver SIGCONT to the stopped child.
    fn resume(&mut self) -> Result<()>;
}

/// A spawned child process, observable through the wait primitive.
#[derive(Debug)]
pub struct Child {
    pid: u32,
}

impl Child {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Wait for Child {
    fn wait(&mut self) -> Result<WaitStatus> {
        // WUNTRACED | WCONTINUED so that job-control stops and resumptions
        // are observable, not just termination.
        let (_, status) = posix::waitpid(self.pid, posix::WUNTRACED | posix::WCONTINUED)
            .map_err(|source| Error::Wait {
                pid: self.pid,
                source,
            })?;
        Ok(status)
    }

    fn resume(&mut self) -> Result<()> {
        posix::kill(self.pid, posix::SIGCONT).map_err(|source| Error::Resume {
            pid: self.pid,
            source,
        })
    }
}

/// Drives a single child from launch to a terminal outcome.
///
/// The supervisor exists in two flavors selected at construction:
///
/// - [`new`](Self::new) follows intermediate stops: a stopped child is
///   reported, resumed with SIGCONT, and waited on again, and the loop only
///   ends on exit or signal termination.
/// - [`single_shot`](Self::single_shot) models a synchronous invocation
///   that returns one final status: whatever the first wait observes is
///   reported and returned directly, never treated as a loop trigger.
pub struct Supervisor {
    follow_stops: bool,
    cell: Arc<ChildCell>,
}

impl Supervisor {
    /// A supervisor that observes and resumes intermediate stops.
    pub fn new(cell: Arc<ChildCell>) -> Supervisor {
        Supervisor {
            follow_stops: true,
            cell,
        }
    }

    /// A supervisor that reports the first observed status and returns.
    pub fn single_shot(cell: Arc<ChildCell>) -> Supervisor {
        Supervisor {
            follow_stops: false,
            cell,
        }
    }

    /// Launch the child and supervise it until an outcome is produced,
    /// feeding each observed transition to `report`.
    ///
    /// On success the returned outcome is terminal in the looping flavor;
    /// the single-shot flavor may return a `Stopped` or `Continued` outcome,
    /// in which case the child stays recorded in the shared cell for the
    /// teardown guard to clean up.
    pub fn run(&self, spec: &LaunchSpec, report: impl FnMut(&Report)) -> Result<Outcome> {
        let mut child = self.launch(spec)?;
        let pid = child.pid();
        let result = self.observe(&mut child, report);
        if let Ok(outcome) = &result
            && outcome.is_terminal()
        {
            self.cell.clear(pid);
        }
        result
    }

    /// Fork and exec the child described by `spec`, recording its pid in
    /// the shared cell.
    ///
    /// Exec failures in the child are reported back to the supervisor over
    /// a close-on-exec pipe, so a spawn that cannot run the executable
    /// surfaces as an error here rather than as a child exiting 127 for
    /// mysterious reasons.
    pub fn launch(&self, spec: &LaunchSpec) -> Result<Child> {
        let exec_fail_pipe = posix::pipe().map_err(Error::Spawn)?;
        posix::set_cloexec(&exec_fail_pipe.0).map_err(Error::Spawn)?;
        posix::set_cloexec(&exec_fail_pipe.1).map_err(Error::Spawn)?;
        let (mut read_end, mut write_end) = exec_fail_pipe;

        // Everything the child needs is prepared up front; between fork and
        // exec the child must stay away from the allocator.
        let candidates = resolve::candidates(&spec.path);
        let prepared = posix::prep_exec(
            &candidates.primary,
            candidates.fallback.as_deref(),
            &spec.argv,
            spec.env.as_deref(),
            spec.cwd.as_deref().map(|p| p.as_os_str()),
        )
        .map_err(Error::Spawn)?;

        let pid = unsafe {
            match posix::fork().map_err(Error::Spawn)? {
                Some(child_pid) => child_pid,
                None => {
                    drop(read_end);
                    let err = exec_child(&prepared);
                    let errno = err.raw_os_error().unwrap_or(-1);
                    write_end.write_all(&errno.to_le_bytes()).ok();
                    posix::_exit(127);
                }
            }
        };
        self.cell.put(pid);
        debug!("spawned child {} for {:?}", pid, spec.path);

        drop(write_end);
        match read_exact_or_eof::<4>(&mut read_end).map_err(Error::Spawn)? {
            None => Ok(Child { pid }),
            Some(errno_buf) => {
                // The child never ran the program; take it back out of the
                // cell and reap it before surfacing the error.
                self.cell.clear(pid);
                posix::waitpid(pid, 0).ok();
                let source = io::Error::from_raw_os_error(i32::from_le_bytes(errno_buf));
                if source.raw_os_error() == Some(posix::ENOENT) {
                    Err(Error::NotFound(spec.path.clone()))
                } else {
                    Err(Error::Exec {
                        path: spec.path.clone(),
                        source,
                    })
                }
            }
        }
    }

    /// Wait on the child until the state machine produces an outcome,
    /// feeding each observed transition to `report`.
    ///
    /// The loop ends when the decoded outcome is `Exited` or `Signaled`;
    /// stops are resumed and resumptions waited through. In single-shot
    /// mode the first decoded outcome ends supervision regardless of
    /// variant.
    pub fn observe<W: Wait>(
        &self,
        child: &mut W,
        mut report: impl FnMut(&Report),
    ) -> Result<Outcome> {
        loop {
            let status = child.wait()?;
            let outcome = status.decode();
            match Report::from_outcome(&outcome) {
                Some(r) => report(&r),
                None => warn!(
                    "unrecognized wait status {:#x}, still waiting",
                    status.raw()
                ),
            }
            match outcome {
                Outcome::Exited { .. } | Outcome::Signaled { .. } => return Ok(outcome),
                Outcome::Stopped { .. } => {
                    if !self.follow_stops {
                        return Ok(outcome);
                    }
                    child.resume()?;
                }
                Outcome::Continued => {
                    if !self.follow_stops {
                        return Ok(outcome);
                    }
                }
                // Defensive: not a recognized transition, keep waiting.
                Outcome::Unknown(_) => {}
            }
        }
    }
}

// Runs in the forked child; only returns if exec failed. Resets inherited
// signal dispositions before transferring control to the child program.
fn exec_child(prepared: &posix::PreparedExec) -> io::Error {
    if let Err(e) = posix::reset_signal_dispositions() {
        return e;
    }
    prepared.exec()
}

/// Read exactly N bytes, or return None on immediate EOF. Similar to
/// read_exact(), but distinguishes between no read and partial read (which
/// is treated as error).
fn read_exact_or_eof<const N: usize>(source: &mut File) -> io::Result<Option<[u8; N]>> {
    let mut buf = [0u8; N];
    let mut total_read = 0;
    while total_read < N {
        let n = source.read(&mut buf[total_read..])?;
        if n == 0 {
            break;
        }
        total_read += n;
    }
    match total_read {
        0 => Ok(None),
        n if n == N => Ok(Some(buf)),
        _ => Err(io::ErrorKind::UnexpectedEof.into()),
    }
}
