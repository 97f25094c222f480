// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Expanding `--patterns` into the concrete watch set.
//! - Building the exclusion set and filtering paths against it.
//! - Owning the `notify` watch handle and its subscriptions.
//! - Pumping raw events from the OS into the debouncer.
//!
//! It does **not** know about processes; it only turns filesystem changes
//! into raw events.

pub mod event_loop;
pub mod exclude;
pub mod path_utils;
pub mod patterns;
pub mod registry;
pub mod source;

pub use event_loop::{EventLoop, LoopExit, LoopStats};
pub use exclude::{filter, unique, ExcludeSet, DEFAULT_EXCLUDES};
pub use patterns::{expand_patterns, ExpandOptions, CWD_PATTERN};
pub use registry::{plan_subscriptions, SubscriptionPlan, WatchRegistry};
pub use source::{ChangeSource, NotifySource};
