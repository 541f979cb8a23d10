use std::env;
use std::ffi::{CString, OsStr, OsString};
use std::fs::File;
use std::io::{Error, Result};
use std::iter;
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::ptr;

use crate::status::WaitStatus;

pub use libc::{ENOENT, ESRCH};
pub use libc::{SIGCONT, SIGKILL};

pub const WUNTRACED: i32 = libc::WUNTRACED;
pub const WCONTINUED: i32 = libc::WCONTINUED;

// Highest signal number we reset; Linux user-space signals are 1..=64.
const NSIG: libc::c_int = 64;

fn check_err<T: Ord + Default>(num: T) -> Result<T> {
    if num < T::default() {
        return Err(Error::last_os_error());
    }
    Ok(num)
}

pub fn pipe() -> Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    check_err(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    Ok(unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) })
}

pub fn set_cloexec(f: &File) -> Result<()> {
    let fd = f.as_raw_fd();
    let old = check_err(unsafe { libc::fcntl(fd, libc::F_GETFD) })?;
    check_err(unsafe { libc::fcntl(fd, libc::F_SETFD, old | libc::FD_CLOEXEC) })?;
    Ok(())
}

/// Forks the process.
///
/// Returns `Ok(Some(pid))` in the parent and `Ok(None)` in the child.
///
/// # Safety
///
/// In a multi-threaded program the child may only call async-signal-safe
/// functions until it calls `exec` or `_exit`.
pub unsafe fn fork() -> Result<Option<u32>> {
    let pid = check_err(unsafe { libc::fork() })?;
    if pid == 0 { Ok(None) } else { Ok(Some(pid as u32)) }
}

fn os_to_cstring(s: &OsStr) -> Result<CString> {
    let bytes = s.as_bytes();
    if bytes.iter().any(|&b| b == 0) {
        return Err(Error::from_raw_os_error(libc::EINVAL));
    }
    Ok(CString::new(bytes)
        // not expected to fail on Unix, as Unix paths *are* C strings
        .expect("converting Unix path to C string"))
}

#[derive(Debug)]
struct CVec {
    // Individual C strings, pointed to by elements of self.ptrs.
    #[allow(dead_code)]
    strings: Vec<CString>,

    // nullptr-terminated vector of pointers into self.strings.
    ptrs: Vec<*const libc::c_char>,
}

impl CVec {
    fn new<S: AsRef<OsStr>>(slice: &[S]) -> Result<CVec> {
        let strings = slice
            .iter()
            .map(|x| os_to_cstring(x.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let ptrs: Vec<_> = strings
            .iter()
            .map(|s| s.as_ptr())
            .chain(iter::once(ptr::null()))
            .collect();
        Ok(CVec { strings, ptrs })
    }

    fn as_c_vec(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }
}

/// Exec request with every string pre-converted, so that the forked child
/// can run it without touching the allocator.
#[derive(Debug)]
pub struct PreparedExec {
    candidates: Vec<CString>,
    fallback: Option<CString>,
    argv: CVec,
    env: Option<CVec>,
    cwd: Option<CString>,
}

/// Prepare an exec in the parent, ahead of fork.
///
/// A `primary` containing a directory separator yields a single candidate;
/// a bare name expands to one candidate per `PATH` entry (execvpe is not
/// POSIX, so the search is emulated, and it uses the supervisor's own
/// `PATH` even when the child gets an explicit environment). The optional
/// `fallback` path is only tried when every candidate came up "not found".
pub fn prep_exec(
    primary: &OsStr,
    fallback: Option<&OsStr>,
    argv: &[OsString],
    env: Option<&[OsString]>,
    cwd: Option<&OsStr>,
) -> Result<PreparedExec> {
    let candidates = if primary.as_bytes().contains(&b'/') {
        vec![os_to_cstring(primary)?]
    } else {
        match env::var_os("PATH") {
            Some(path) => env::split_paths(&path)
                .map(|dir| os_to_cstring(dir.join(primary).as_os_str()))
                .collect::<Result<Vec<_>>>()?,
            None => vec![],
        }
    };
    Ok(PreparedExec {
        candidates,
        fallback: fallback.map(os_to_cstring).transpose()?,
        argv: CVec::new(argv)?,
        env: env.map(|e| CVec::new(e)).transpose()?,
        cwd: cwd.map(os_to_cstring).transpose()?,
    })
}

impl PreparedExec {
    fn raw_exec(&self, cmd: &CString) -> Error {
        unsafe {
            match &self.env {
                Some(env) => libc::execve(cmd.as_ptr(), self.argv.as_c_vec(), env.as_c_vec()),
                None => libc::execv(cmd.as_ptr(), self.argv.as_c_vec()),
            };
        }
        Error::last_os_error()
    }

    /// Replace the current process image. Only returns on failure, with the
    /// error of the last exec attempt; "not found" triggers the one-shot
    /// fallback, any other failure is final.
    pub fn exec(&self) -> Error {
        if let Some(dir) = &self.cwd {
            if unsafe { libc::chdir(dir.as_ptr()) } < 0 {
                return Error::last_os_error();
            }
        }
        let mut last = Error::from_raw_os_error(ENOENT);
        for candidate in &self.candidates {
            last = self.raw_exec(candidate);
        }
        if last.raw_os_error() == Some(ENOENT)
            && let Some(fallback) = &self.fallback
        {
            last = self.raw_exec(fallback);
        }
        last
    }
}

pub fn _exit(status: u8) -> ! {
    unsafe { libc::_exit(status as libc::c_int) }
}

/// Waits for a state change in the child, returning its pid and the raw
/// status word. Decoding the word is the caller's business.
pub fn waitpid(pid: u32, flags: i32) -> Result<(u32, WaitStatus)> {
    let mut status = 0 as libc::c_int;
    let pid = check_err(unsafe {
        libc::waitpid(
            pid as libc::pid_t,
            &mut status as *mut libc::c_int,
            flags as libc::c_int,
        )
    })?;
    Ok((pid as u32, WaitStatus::from_raw(status)))
}

pub fn kill(pid: u32, signal: i32) -> Result<()> {
    check_err(unsafe { libc::kill(pid as libc::pid_t, signal) })?;
    Ok(())
}

/// Resets every signal disposition of the current process to the default
/// action with an empty per-entry mask, then clears the blocked-signal
/// mask.
///
/// Establishes a known-default signal environment before handing control
/// to foreign code: a child must not inherit custom handlers or a
/// non-empty mask from the supervisor. Entries the kernel refuses to
/// change (SIGKILL, SIGSTOP) are skipped. Idempotent.
pub fn reset_signal_dispositions() -> Result<()> {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = libc::SIG_DFL;
        action.sa_flags = 0;
        check_err(libc::sigemptyset(&mut action.sa_mask))?;
        for sig in 1..=NSIG {
            if sig == libc::SIGKILL || sig == libc::SIGSTOP {
                continue;
            }
            // Reserved low real-time entries fail with EINVAL on some
            // kernels; those hold no custom disposition to reset.
            libc::sigaction(sig, &action, ptr::null_mut());
        }
        let mut set: libc::sigset_t = mem::zeroed();
        check_err(libc::sigemptyset(&mut set))?;
        check_err(libc::pthread_sigmask(libc::SIG_SETMASK, &set, ptr::null_mut()))?;
    }
    Ok(())
}
