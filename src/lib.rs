//! Supervision of a single child process on Unix.
//!
//! This crate launches a child, blocks until the child's state changes, and
//! decodes the packed `waitpid()` status word into a structured
//! [`Outcome`]: normal exit, signal termination, job-control stop, or
//! resumption. A [`Supervisor`] drives the whole protocol, in one of two
//! flavors:
//!
//! - the looping flavor resumes stopped children with SIGCONT and keeps
//!   waiting until the child exits or is killed;
//! - the single-shot flavor, run by [`Worker`] on a dedicated background
//!   thread, performs one synchronous invocation and reports whatever final
//!   status it observes.
//!
//! The pid of the outstanding child lives in an atomically shared
//! [`ChildCell`], so a [`TeardownGuard`] can forcibly terminate it when the
//! supervisor itself is torn down, without racing the supervisor's own
//! cleanup.
//!
//! ```no_run
//! # use std::sync::Arc;
//! use childminder::{ChildCell, LaunchSpec, Supervisor};
//!
//! # fn main() -> childminder::Result<()> {
//! let cell = Arc::new(ChildCell::new());
//! let spec = LaunchSpec::new("sleep").arg("1");
//! let outcome = Supervisor::new(cell).run(&spec, |report| {
//!     println!("{}", report);
//! })?;
//! assert!(outcome.is_terminal());
//! # Ok(())
//! # }
//! ```

mod error;
mod guard;
mod posix;
mod resolve;
mod signals;
mod status;
mod supervisor;
mod worker;

pub use error::{Error, Result};
pub use guard::{ChildCell, TeardownGuard};
pub use posix::reset_signal_dispositions;
pub use resolve::{Candidates, candidates};
pub use signals::{UNKNOWN_SIGNAL, name_of};
pub use status::{Outcome, WaitStatus};
pub use supervisor::{Child, LaunchSpec, Report, ReportKind, Supervisor, Wait};
pub use worker::{DEFAULT_PATH, Worker, WorkerConfig};

#[cfg(test)]
mod tests;
