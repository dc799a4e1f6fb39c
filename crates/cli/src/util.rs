//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Find repository root by walking up from `start` to find .git
pub fn find_repo_root_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(".git").exists() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!("Not a git repository (no .git found above {})", start.display()),
        }
    }
}

/// Resolve the `--root` argument, discovering it from cwd when absent
pub fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => root
            .canonicalize()
            .with_context(|| format!("Repository root {} does not exist", root.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            find_repo_root_from(&cwd)
        }
    }
}

/// Display `path` relative to `root` when it lies inside it
pub fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
