// src/config/validate.rs

use crate::config::model::{RawWatchConfig, WatchConfig};
use crate::errors::{ReliveError, Result};

impl TryFrom<RawWatchConfig> for WatchConfig {
    type Error = ReliveError;

    fn try_from(raw: RawWatchConfig) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(WatchConfig::new_unchecked(raw))
    }
}

/// Check the invariants every later stage relies on.
pub fn validate_config(cfg: &RawWatchConfig) -> Result<()> {
    ensure_command(cfg)?;
    ensure_something_to_watch(cfg)?;
    validate_timings(cfg)?;
    Ok(())
}

fn ensure_command(cfg: &RawWatchConfig) -> Result<()> {
    if cfg.command.trim().is_empty() {
        return Err(ReliveError::Config(
            "command cannot be empty (use --command/-c)".to_string(),
        ));
    }
    Ok(())
}

fn ensure_something_to_watch(cfg: &RawWatchConfig) -> Result<()> {
    if cfg.patterns.iter().all(|p| p.trim().is_empty()) && !cfg.watch_cwd {
        return Err(ReliveError::Config(
            "at least one pattern is required (use --patterns/-p or --watchcur/-w)".to_string(),
        ));
    }
    Ok(())
}

fn validate_timings(cfg: &RawWatchConfig) -> Result<()> {
    if cfg.debounce_ms == 0 {
        return Err(ReliveError::Config(
            "debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.kill_timeout_ms == 0 {
        return Err(ReliveError::Config(
            "kill_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(command: &str) -> RawWatchConfig {
        let mut raw = RawWatchConfig::new("/project", command);
        raw.patterns.push("src".to_string());
        raw
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = WatchConfig::try_from(raw("   ")).unwrap_err();
        assert!(matches!(err, ReliveError::Config(msg) if msg.contains("command")));
    }

    #[test]
    fn patterns_required_unless_watching_cwd() {
        let mut cfg = raw("make");
        cfg.patterns.clear();
        assert!(WatchConfig::try_from(cfg.clone()).is_err());

        cfg.watch_cwd = true;
        assert!(WatchConfig::try_from(cfg).is_ok());
    }

    #[test]
    fn zero_timings_are_rejected() {
        let mut cfg = raw("make");
        cfg.debounce_ms = 0;
        assert!(WatchConfig::try_from(cfg).is_err());

        let mut cfg = raw("make");
        cfg.kill_timeout_ms = 0;
        assert!(WatchConfig::try_from(cfg).is_err());
    }

    #[test]
    fn command_is_trimmed() {
        let cfg = WatchConfig::try_from(raw("  cargo test \n")).unwrap();
        assert_eq!(cfg.command, "cargo test");
        assert_eq!(cfg.debounce.as_millis(), 100);
        assert!(cfg.recursive);
    }
}
