use clap::ValueEnum;
use serde::Deserialize;

/// How the quiet period of the debouncer reacts to further events.
///
/// - `Trailing`: every accepted event pushes the deadline out again, so the
///   command only runs once the tree has been quiet for the whole period.
///   Sustained edits postpone the run until they stop.
/// - `Fixed`: the first event of a burst arms the timer and later events
///   only join the pending change. Sustained edits still fire once per
///   period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DebounceMode {
    #[default]
    Trailing,
    Fixed,
}

/// What to do with a change that arrives while the command is still running.
///
/// - `Restart`: terminate the running command and start a fresh one.
/// - `Queue`: let the running command finish, then run once more. Only a
///   single pending run is remembered no matter how many changes arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    #[default]
    Restart,
    Queue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        mode: DebounceMode,
        busy: BusyPolicy,
    }

    #[test]
    fn policies_deserialize_lowercase() {
        let w: Wrapper = toml::from_str("mode = \"fixed\"\nbusy = \"queue\"").unwrap();
        assert_eq!(w.mode, DebounceMode::Fixed);
        assert_eq!(w.busy, BusyPolicy::Queue);
    }

    #[test]
    fn defaults_are_trailing_and_restart() {
        assert_eq!(DebounceMode::default(), DebounceMode::Trailing);
        assert_eq!(BusyPolicy::default(), BusyPolicy::Restart);
    }
}
