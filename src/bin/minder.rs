//! Supervise a command given on the command line.
//!
//! Runs the command as a child process, prints a line for every observed
//! state transition, resumes the child if it gets stopped, and exits 0 once
//! the child reaches a terminal state, whatever the child's own status.
//! Supervisor-internal failures exit non-zero.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use childminder::{ChildCell, LaunchSpec, Supervisor};

fn main() -> ExitCode {
    let argv: Vec<_> = env::args_os().skip(1).collect();
    let Some(spec) = LaunchSpec::from_argv(argv) else {
        eprintln!("usage: minder COMMAND [ARG]...");
        return ExitCode::from(2);
    };

    let supervisor = Supervisor::new(Arc::new(ChildCell::new()));
    match supervisor.run(&spec, |report| println!("{}", report)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("minder: {}", err);
            ExitCode::FAILURE
        }
    }
}
