use std::fmt;

use crate::signals;

/// Raw status word describing a child state change.
///
/// This is an opaque wrapper over the platform's packed `waitpid()` status.
/// It is never mutated, only decoded via [`decode`](Self::decode).
#[derive(Eq, PartialEq, Hash, Copy, Clone)]
pub struct WaitStatus(i32);

/// Sentinel status reported for a child resumed by SIGCONT.
const CONTINUED_WORD: i32 = 0xffff;

impl WaitStatus {
    /// Create a `WaitStatus` from the raw platform value.
    pub fn from_raw(raw: i32) -> WaitStatus {
        WaitStatus(raw)
    }

    /// The raw platform value.
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Decode the status word into a structured [`Outcome`].
    ///
    /// Pure and total: every status in the 16-bit encoding space produced by
    /// `waitpid()` maps to exactly one variant. Values outside that space
    /// cannot come from the wait primitive and decode to
    /// [`Outcome::Unknown`].
    ///
    /// The tests are ordered by priority. "Exited" must come before
    /// "stopped" because the raw value 0 is ambiguous without it, and the
    /// all-ones "continued" sentinel must be recognized before the stop and
    /// signal patterns that its bits also happen to match.
    pub fn decode(self) -> Outcome {
        let raw = self.0;
        if raw & !0xffff != 0 {
            return Outcome::Unknown(self);
        }
        let termsig = raw & 0x7f;
        if termsig == 0 {
            return Outcome::Exited {
                code: ((raw >> 8) & 0xff) as u8,
            };
        }
        if raw == CONTINUED_WORD {
            return Outcome::Continued;
        }
        if raw & 0xff == 0x7f {
            return Outcome::Stopped {
                signal: (raw >> 8) & 0xff,
            };
        }
        Outcome::Signaled {
            signal: termsig,
            core_dumped: raw & 0x80 != 0,
        }
    }
}

impl fmt::Debug for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WaitStatus({:#06x})", self.0)
    }
}

/// Decoded child state transition.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Outcome {
    /// The child exited voluntarily with the specified exit code.
    Exited { code: u8 },

    /// The child was terminated by a signal.
    Signaled { signal: i32, core_dumped: bool },

    /// The child was stopped by a job-control signal and can be resumed.
    Stopped { signal: i32 },

    /// The child was resumed by SIGCONT.
    Continued,

    /// The status word matched no recognized encoding.
    ///
    /// This should not occur in normal operation; a supervisor treats it as
    /// "keep waiting".
    Unknown(WaitStatus),
}

impl Outcome {
    /// True if this outcome ends supervision: the child no longer exists.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Exited { .. } | Outcome::Signaled { .. })
    }

    /// True if the child exited voluntarily with code 0.
    pub fn success(&self) -> bool {
        matches!(self, Outcome::Exited { code: 0 })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Outcome::Exited { code } => write!(f, "exit code {}", code),
            Outcome::Signaled {
                signal,
                core_dumped,
            } => {
                write!(f, "signal {} ({})", signal, signals::name_of(signal))?;
                if core_dumped {
                    write!(f, ", core dumped")?;
                }
                Ok(())
            }
            Outcome::Stopped { signal } => {
                write!(f, "stopped by signal {} ({})", signal, signals::name_of(signal))
            }
            Outcome::Continued => write!(f, "continued"),
            Outcome::Unknown(status) => {
                write!(f, "unrecognized wait status {:#x}", status.raw())
            }
        }
    }
}
