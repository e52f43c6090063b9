//! Configuration module for childwatch
//!
//! Per-run options plus layered defaults from files and environment.

pub mod loader;
pub mod model;

pub use loader::{config_paths, find_config_files, load_config};
pub use model::*;
