// src/errors.rs

//! Crate-wide error type.
//!
//! Startup failures (`InvalidPattern`, `Filesystem`, `WatchInit`, `Config`)
//! abort the process before any watch is registered. `CommandStart` and
//! `ProcessTerminationTimeout` only ever surface in logs: the watch loop keeps
//! running past them.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReliveError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to initialise file watching: {0}")]
    WatchInit(String),

    #[error("failed to start command '{command}': {source}")]
    CommandStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process {pid} did not exit within {waited:?} of being asked to terminate")]
    ProcessTerminationTimeout { pid: u32, waited: Duration },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReliveError {
    /// True for errors that must stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ReliveError::CommandStart { .. } | ReliveError::ProcessTerminationTimeout { .. }
        )
    }
}

impl From<notify::Error> for ReliveError {
    fn from(err: notify::Error) -> Self {
        ReliveError::WatchInit(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReliveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_are_not_fatal() {
        let start = ReliveError::CommandStart {
            command: "nope".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let timeout = ReliveError::ProcessTerminationTimeout {
            pid: 42,
            waited: Duration::from_millis(10),
        };
        assert!(!start.is_fatal());
        assert!(!timeout.is_fatal());
        assert!(ReliveError::WatchInit("no inotify".into()).is_fatal());
        assert!(
            ReliveError::InvalidPattern {
                pattern: "[".into(),
                reason: "unclosed".into()
            }
            .is_fatal()
        );
    }
}
