// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`supervisor`] owns the single running-process slot and applies the
//!   busy policy to each logical change.
//! - [`runner`] spawns one shell process and drives it to completion or
//!   termination.
//! - [`signal`] sends termination signals to a command's process group.
//! - [`backend`] provides the `CommandBackend` trait and the production
//!   `ShellBackend`, which tests can replace with a fake.

pub mod backend;
pub mod runner;
pub mod signal;
pub mod supervisor;

pub use backend::{CommandBackend, RunFuture, RunRequest, ShellBackend};
pub use runner::RunOutcome;
pub use supervisor::{spawn_supervisor, Supervisor};
