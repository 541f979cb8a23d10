use crate::{UNKNOWN_SIGNAL, name_of};

#[test]
fn every_table_entry_has_a_name() {
    let table = [
        libc::SIGHUP,
        libc::SIGINT,
        libc::SIGQUIT,
        libc::SIGILL,
        libc::SIGTRAP,
        libc::SIGABRT,
        libc::SIGBUS,
        libc::SIGFPE,
        libc::SIGKILL,
        libc::SIGUSR1,
        libc::SIGSEGV,
        libc::SIGUSR2,
        libc::SIGPIPE,
        libc::SIGALRM,
        libc::SIGTERM,
        libc::SIGCHLD,
        libc::SIGCONT,
        libc::SIGSTOP,
        libc::SIGTSTP,
        libc::SIGTTIN,
        libc::SIGTTOU,
    ];
    for signal in table {
        assert_ne!(name_of(signal), UNKNOWN_SIGNAL, "signal {}", signal);
    }
}

#[test]
fn known_names_are_canonical() {
    assert_eq!(name_of(libc::SIGKILL), "SIGKILL");
    assert_eq!(name_of(libc::SIGSEGV), "SIGSEGV");
    assert_eq!(name_of(libc::SIGCONT), "SIGCONT");
}

#[test]
fn unmapped_numbers_are_unknown() {
    assert_eq!(name_of(62), UNKNOWN_SIGNAL);
    assert_eq!(name_of(0), UNKNOWN_SIGNAL);
    assert_eq!(name_of(-4), UNKNOWN_SIGNAL);
}
