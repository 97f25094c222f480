// src/config/mod.rs

//! Configuration for relive.
//!
//! Responsibilities:
//! - Define the optional TOML file model and the resolved `WatchConfig`
//!   (`model.rs`).
//! - Load the file and merge it with the CLI flags (`loader.rs`).
//! - Validate the merged result (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_resolve, load_from_path, resolve};
pub use model::{ConfigFile, RawWatchConfig, WatchConfig};
pub use validate::validate_config;
