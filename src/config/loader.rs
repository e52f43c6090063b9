//! Configuration loader with XDG-compliant path resolution
//!
//! Loads default execution settings from multiple locations with layered priority:
//! 1. Built-in defaults (30s deadline, mirroring on)
//! 2. `~/.config/childwatch/config.toml`
//! 3. `./.childwatch.toml`
//! 4. An explicit override path
//! 5. `CHILDWATCH_*` environment variables (highest priority)

use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::model::{ConfigFile, ExecutionConfig};

/// Application name used for XDG directories
const APP_NAME: &str = "childwatch";

/// Environment variable prefix, e.g. `CHILDWATCH_DEADLINE_MS=500`
const ENV_PREFIX: &str = "CHILDWATCH_";

/// Get config search paths in priority order (lowest to highest)
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_NAME).join("config.toml"));
    }

    paths.push(PathBuf::from(format!(".{}.toml", APP_NAME)));

    paths
}

/// Load execution defaults with XDG layering
///
/// # Arguments
/// * `override_path` - Optional config file that takes priority over the search paths
pub fn load_config(override_path: Option<&str>) -> Result<ExecutionConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

    for path in config_paths() {
        if path.exists() {
            tracing::debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        }
    }

    if let Some(path) = override_path {
        let path = PathBuf::from(path);
        if path.exists() {
            tracing::debug!("Loading override config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        } else {
            tracing::warn!("Override config not found: {}", path.display());
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX));

    let file: ConfigFile = figment.extract().context("Failed to load configuration")?;
    Ok(file.into())
}

/// Find all existing config files (for debugging/introspection)
pub fn find_config_files() -> Vec<PathBuf> {
    config_paths().into_iter().filter(|p| p.exists()).collect()
}
