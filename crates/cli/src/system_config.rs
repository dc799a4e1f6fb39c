//! System configuration file
//!
//! Lives at `<config_dir>/changetrack/config.toml`. A missing file means
//! defaults; a present but invalid file is an error.

use anyhow::{Context, Result};
use ct_core::TrackerConfig;
use std::path::{Path, PathBuf};

pub use ct_core::config::example_config;

/// Path of the system config file, if the platform has a config directory
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("changetrack").join("config.toml"))
}

/// Load from `explicit` if given, else from the system file, else defaults
pub fn load(explicit: Option<&Path>) -> Result<TrackerConfig> {
    if let Some(path) = explicit {
        return TrackerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    match config_file_path() {
        Some(path) if path.exists() => TrackerConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        _ => Ok(TrackerConfig::default()),
    }
}

/// Write the example config to the system path unless a file exists
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, example_config())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracker]\nreconcile_interval_secs = 5\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.tracker.reconcile_interval_secs, 5);
    }

    #[test]
    fn test_invalid_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracker]\nqueue_interval_ms = 0\n").unwrap();

        assert!(load(Some(&path)).is_err());
        assert!(load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
