//! List files changed against the baseline

use crate::{system_config, util};
use anyhow::{Context, Result};
use ct_core::collab::{NoOpenFiles, NoSavedFiles};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ChangedReport {
    root: PathBuf,
    baseline: Option<BaselineReport>,
    files: Vec<String>,
}

#[derive(Serialize)]
struct BaselineReport {
    reference: String,
    commit: String,
    distance: u64,
}

pub async fn run(root: Option<PathBuf>, json: bool, config_path: Option<&Path>) -> Result<()> {
    let root = util::resolve_root(root)?;
    let config = system_config::load(config_path)?;
    let detector = super::detector(&config);

    let baseline = detector.baseline(&root).await;
    let mut files: Vec<String> = detector
        .changed_files_vs_baseline(&root, &NoSavedFiles, &NoOpenFiles)
        .await
        .iter()
        .map(|path| util::display_relative(path, &root))
        .collect();
    files.sort();

    if json {
        let report = ChangedReport {
            root,
            baseline: baseline.map(|b| BaselineReport {
                reference: b.reference,
                commit: b.commit,
                distance: b.distance,
            }),
            files,
        };
        let out = serde_json::to_string_pretty(&report).context("Failed to encode JSON")?;
        println!("{}", out);
        return Ok(());
    }

    match &baseline {
        Some(baseline) => eprintln!("{} {}", "Baseline:".dimmed(), baseline.to_string().cyan()),
        None => eprintln!("{}", "No baseline found; nothing is considered changed".yellow()),
    }

    for file in &files {
        println!("{}", file);
    }

    if files.is_empty() && baseline.is_some() {
        eprintln!("{}", "No changed files".dimmed());
    }

    Ok(())
}
