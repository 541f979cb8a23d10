use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use log::{debug, warn};

use crate::posix;

const NO_CHILD: i32 = -1;

/// Shared cell holding the pid of the currently supervised child.
///
/// This is the only state shared between a supervising flow and an
/// asynchronous shutdown trigger. The supervisor is the sole writer during
/// normal operation and [`TeardownGuard`] the sole writer during shutdown;
/// both go through the same atomic, so reads and writes cannot tear and the
/// swap/compare-exchange pair lets exactly one side win the race to clear
/// an entry.
#[derive(Debug, Default)]
pub struct ChildCell(AtomicI32);

impl ChildCell {
    pub fn new() -> ChildCell {
        ChildCell(AtomicI32::new(NO_CHILD))
    }

    /// Record `pid` as the outstanding child.
    pub fn put(&self, pid: u32) {
        self.0.store(pid as i32, Ordering::Release);
    }

    /// Clear the cell, but only if it still holds `pid`. Losing to a
    /// concurrent [`take`](Self::take) leaves the cell cleared anyway.
    pub fn clear(&self, pid: u32) {
        let _ = self
            .0
            .compare_exchange(pid as i32, NO_CHILD, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Atomically take the outstanding pid, leaving the cell empty.
    pub fn take(&self) -> Option<u32> {
        match self.0.swap(NO_CHILD, Ordering::AcqRel) {
            NO_CHILD => None,
            pid => Some(pid as u32),
        }
    }

    /// The outstanding pid, if any.
    pub fn get(&self) -> Option<u32> {
        match self.0.load(Ordering::Acquire) {
            NO_CHILD => None,
            pid => Some(pid as u32),
        }
    }
}

/// Forcibly terminates the outstanding child when the supervisor is torn
/// down.
#[derive(Debug)]
pub struct TeardownGuard {
    cell: Arc<ChildCell>,
}

impl TeardownGuard {
    pub fn new(cell: Arc<ChildCell>) -> TeardownGuard {
        TeardownGuard { cell }
    }

    /// The pid this guard would currently act on.
    pub fn child(&self) -> Option<u32> {
        self.cell.get()
    }

    /// Kill the outstanding child, if there is one.
    ///
    /// Safe to invoke concurrently with the supervisor clearing the cell on
    /// natural termination, and idempotent: whoever swaps the cell first
    /// wins, and a child that already exited on its own (ESRCH) is not an
    /// error.
    pub fn shutdown(&self) {
        let Some(pid) = self.cell.take() else {
            return;
        };
        debug!("shutdown: killing outstanding child {}", pid);
        match posix::kill(pid, posix::SIGKILL) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(posix::ESRCH) => {}
            Err(e) => warn!("shutdown: failed to kill child {}: {}", pid, e),
        }
    }
}
