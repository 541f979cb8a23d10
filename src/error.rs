use std::ffi::OsString;
use std::io;

/// All errors produced while supervising a child.
///
/// Every variant is fatal for the supervision flow it occurs in: the flow
/// stops and the error is surfaced to the caller. An unrecognized wait
/// status is not an error; the supervisor absorbs it and keeps waiting.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The child could not be created at all.
    #[error("failed to spawn child: {0}")]
    Spawn(#[source] io::Error),

    /// The requested executable was not found, even after the one-shot
    /// working-directory fallback.
    #[error("executable not found: {0:?}")]
    NotFound(OsString),

    /// Exec failed for a reason other than "not found".
    #[error("failed to execute {path:?}: {source}")]
    Exec {
        path: OsString,
        #[source]
        source: io::Error,
    },

    /// The wait primitive itself failed; the child's state is unknowable.
    #[error("wait for child {pid} failed: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// SIGCONT delivery to a stopped child failed. A half-resumed child is
    /// an unrecoverable supervision state.
    #[error("failed to resume stopped child {pid}: {source}")]
    Resume {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
