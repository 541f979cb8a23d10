mod signals;
mod worker;

use std::time::{Duration, Instant};

use crate::WaitStatus;

// Raw status encodings, as packed by the kernel for waitpid().
pub fn exited(code: u8) -> WaitStatus {
    WaitStatus::from_raw((code as i32) << 8)
}

pub fn stopped(signal: i32) -> WaitStatus {
    WaitStatus::from_raw((signal << 8) | 0x7f)
}

pub fn signaled(signal: i32, core_dumped: bool) -> WaitStatus {
    WaitStatus::from_raw(signal | if core_dumped { 0x80 } else { 0 })
}

pub fn continued() -> WaitStatus {
    WaitStatus::from_raw(0xffff)
}

pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn public_types_are_send_and_sync() {
    assert_send_sync::<crate::ChildCell>();
    assert_send_sync::<crate::TeardownGuard>();
    assert_send_sync::<crate::LaunchSpec>();
    assert_send_sync::<crate::Outcome>();
    assert_send_sync::<crate::WaitStatus>();
    assert_send_sync::<crate::Report>();
    assert_send_sync::<crate::Error>();
    assert_send_sync::<crate::Supervisor>();
    assert_send_sync::<crate::Worker>();
}
