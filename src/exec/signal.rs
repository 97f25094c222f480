// src/exec/signal.rs

//! Signalling a command's process group.
//!
//! On Unix the command is started as the leader of its own process group,
//! so signalling `-pid` reaches the shell and everything it spawned.

use std::io;

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Politely ask the group led by `pid` to exit (SIGTERM).
#[cfg(unix)]
pub fn interrupt(pid: u32) -> io::Result<()> {
    signal_group(pid, libc::SIGTERM)
}

/// Forcefully kill the group led by `pid` (SIGKILL).
#[cfg(unix)]
pub fn kill(pid: u32) -> io::Result<()> {
    signal_group(pid, libc::SIGKILL)
}

#[cfg(not(unix))]
pub fn interrupt(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination is not supported on this platform",
    ))
}

#[cfg(not(unix))]
pub fn kill(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process group kill is not supported on this platform",
    ))
}
