//! Configuration command
//!
//! Provides CLI interface to view the tracker configuration.

use crate::system_config;
use anyhow::{Context, Result};
use ct_core::TrackerConfig;
use owo_colors::OwoColorize;
use std::path::Path;

/// List all configuration values
pub async fn run_list(config_path: Option<&Path>) -> Result<()> {
    let config = system_config::load(config_path)?;
    let location = match config_path {
        Some(path) => path.to_path_buf(),
        None => system_config::config_file_path()
            .context("Could not determine config file path")?,
    };

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), location.display().dimmed());

    println!("{}", "[tracker]".yellow());
    println!(
        "  {} = {} {}",
        "queue_interval_ms".cyan(),
        config.tracker.queue_interval_ms,
        format!("({}ms)", config.tracker.queue_interval_ms).dimmed()
    );
    println!(
        "  {} = {} {}",
        "reconcile_interval_secs".cyan(),
        config.tracker.reconcile_interval_secs,
        format!("({}s)", config.tracker.reconcile_interval_secs).dimmed()
    );

    println!("\n{}", "[baseline]".yellow());
    println!(
        "  {} = {}",
        "candidates".cyan(),
        config.baseline.candidates.join(", ")
    );

    println!("\n{}", "[files]".yellow());
    println!(
        "  {} = {}",
        "extensions".cyan(),
        config.files.extensions.join(", ")
    );

    println!("\n{}", "[ignore]".yellow());
    println!("  {} = {}", "use_gitignore".cyan(), config.ignore.use_gitignore);
    println!("  {} = {}", "use_ctignore".cyan(), config.ignore.use_ctignore);
    println!(
        "  {} = {}",
        "additional_patterns".cyan(),
        if config.ignore.additional_patterns.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            config.ignore.additional_patterns.join(", ")
        }
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  queue_interval_ms: 10-60,000");
    println!("  reconcile_interval_secs: 1-86,400");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str, config_path: Option<&Path>) -> Result<()> {
    let config = system_config::load(config_path)?;
    println!("{}", lookup(&config, key)?);
    Ok(())
}

fn lookup(config: &TrackerConfig, key: &str) -> Result<String> {
    let value = match key {
        "tracker.queue_interval_ms" => config.tracker.queue_interval_ms.to_string(),
        "tracker.reconcile_interval_secs" => config.tracker.reconcile_interval_secs.to_string(),
        "baseline.candidates" => config.baseline.candidates.join(","),
        "files.extensions" => config.files.extensions.join(","),
        "ignore.use_gitignore" => config.ignore.use_gitignore.to_string(),
        "ignore.use_ctignore" => config.ignore.use_ctignore.to_string(),
        "ignore.additional_patterns" => config.ignore.additional_patterns.join(","),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'ctrack config list' to see available keys.",
            key
        ),
    };
    Ok(value)
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_keys() {
        let config = TrackerConfig::default();
        assert_eq!(lookup(&config, "tracker.queue_interval_ms").unwrap(), "250");
        assert_eq!(lookup(&config, "ignore.use_ctignore").unwrap(), "true");
        assert!(lookup(&config, "baseline.candidates")
            .unwrap()
            .starts_with("main,master"));
    }

    #[test]
    fn test_lookup_unknown_key() {
        assert!(lookup(&TrackerConfig::default(), "daemon.nope").is_err());
    }
}
