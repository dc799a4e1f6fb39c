//! Track changes continuously until Ctrl-C

use crate::{system_config, util};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracker::ChangeTracker;

pub async fn run(root: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let root = util::resolve_root(root)?;
    let config = system_config::load(config_path)?;

    let display_root = root.clone();
    let tracker = ChangeTracker::builder(&root)
        .config(config)
        .on_change(move |files| print_snapshot(&display_root, files))
        .build()
        .context("Failed to create change tracker")?;

    tracker.start()?;
    eprintln!(
        "{} {} {}",
        "Watching".green(),
        root.display().to_string().cyan(),
        "(Ctrl-C to stop)".dimmed()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracker.stop();
    eprintln!("{}", "Stopped".dimmed());
    Ok(())
}

fn print_snapshot(root: &Path, files: &[PathBuf]) {
    println!(
        "{} {} changed file(s)",
        "●".cyan(),
        files.len().to_string().bold()
    );
    for file in files {
        println!("  {}", util::display_relative(file, root));
    }
}
