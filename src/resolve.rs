use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// Executable paths to try for one launch request.
///
/// The primary candidate is the requested path itself; when that path
/// contains no directory separator, the PATH-searching exec never considers
/// the working directory, so a single `./`-prefixed fallback covers
/// executables that live there. There is no third candidate: a launch that
/// exhausts both is a terminal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    pub primary: OsString,
    pub fallback: Option<OsString>,
}

/// Compute the candidate paths for a requested executable.
pub fn candidates(requested: &OsStr) -> Candidates {
    let bare = !requested.is_empty() && !requested.as_bytes().contains(&b'/');
    let fallback = bare.then(|| {
        let mut prefixed = OsString::from("./");
        prefixed.push(requested);
        prefixed
    });
    Candidates {
        primary: requested.to_owned(),
        fallback,
    }
}
