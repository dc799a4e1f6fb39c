//! Show the baseline commit

use crate::{system_config, util};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

pub async fn run(root: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let root = util::resolve_root(root)?;
    let config = system_config::load(config_path)?;
    let detector = super::detector(&config);

    match detector.baseline(&root).await {
        Some(baseline) => {
            println!("{}", "Baseline".bold());
            println!("  {}  {}", "Branch:".dimmed(), baseline.reference.cyan());
            println!("  {}  {}", "Commit:".dimmed(), baseline.commit.yellow());
            println!("  {}   {} commit(s)", "Ahead:".dimmed(), baseline.distance);
        }
        None => {
            println!("{}", "No baseline found".yellow());
            println!(
                "  {} {}",
                "Tried:".dimmed(),
                detector.candidates().join(", ")
            );
        }
    }

    Ok(())
}
