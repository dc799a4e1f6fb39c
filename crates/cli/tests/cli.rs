//! End-to-end tests for the ctrack binary

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Result of one ctrack invocation
struct CommandResult {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl CommandResult {
    fn success(&self) -> bool {
        self.exit_code == 0
    }
}

fn ctrack(cwd: &Path, args: &[&str]) -> Result<CommandResult> {
    let output = Command::new(env!("CARGO_BIN_EXE_ctrack"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .context("Failed to execute ctrack")?;

    Ok(CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

fn git(root: &Path, args: &[&str]) -> Result<()> {
    let status = Command::new("git")
        .arg("-C")
        .arg(root)
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()?
        .status;
    anyhow::ensure!(status.success(), "git {:?} failed", args);
    Ok(())
}

/// Repository on a feature branch with one committed and one untracked change
fn feature_repo() -> Result<Option<(TempDir, PathBuf)>> {
    if Command::new("git").arg("--version").output().is_err() {
        eprintln!("git not available, skipping");
        return Ok(None);
    }

    let dir = TempDir::new()?;
    let root = dir.path().canonicalize()?;
    git(&root, &["init", "--quiet"])?;
    git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
    std::fs::write(root.join("base.rs"), "fn main() {}\n")?;
    git(&root, &["add", "-A"])?;
    git(&root, &["commit", "--quiet", "-m", "initial"])?;

    git(&root, &["checkout", "--quiet", "-b", "feature"])?;
    std::fs::write(root.join("feature.rs"), "pub fn f() {}\n")?;
    git(&root, &["add", "-A"])?;
    git(&root, &["commit", "--quiet", "-m", "feature"])?;
    std::fs::write(root.join("scratch.py"), "print('hi')\n")?;
    std::fs::write(root.join("notes.txt"), "not code\n")?;

    Ok(Some((dir, root)))
}

#[test]
fn test_changed_json() -> Result<()> {
    let Some((_dir, root)) = feature_repo()? else {
        return Ok(());
    };

    let result = ctrack(&root, &["changed", "--json"])?;
    assert!(result.success(), "stderr: {}", result.stderr);

    let report: serde_json::Value = serde_json::from_str(&result.stdout)?;
    assert_eq!(report["baseline"]["reference"], "main");
    assert_eq!(report["baseline"]["distance"], 1);
    assert_eq!(report["files"], serde_json::json!(["feature.rs", "scratch.py"]));
    Ok(())
}

#[test]
fn test_changed_from_subdirectory() -> Result<()> {
    let Some((_dir, root)) = feature_repo()? else {
        return Ok(());
    };
    let nested = root.join("nested");
    std::fs::create_dir(&nested)?;

    let result = ctrack(&nested, &["changed"])?;
    assert!(result.success(), "stderr: {}", result.stderr);
    let lines: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(lines, vec!["feature.rs", "scratch.py"]);
    Ok(())
}

#[test]
fn test_baseline_command() -> Result<()> {
    let Some((_dir, root)) = feature_repo()? else {
        return Ok(());
    };

    let result = ctrack(&root, &["baseline", "--root", root.to_str().unwrap()])?;
    assert!(result.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains("main"));
    Ok(())
}

#[test]
fn test_missing_root_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("missing");

    let result = ctrack(dir.path(), &["changed", "--root", missing.to_str().unwrap()])?;
    assert!(!result.success());
    assert!(result.stderr.contains("does not exist"));
    Ok(())
}

#[test]
fn test_config_commands() -> Result<()> {
    let dir = TempDir::new()?;
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[tracker]\nreconcile_interval_secs = 7\n")?;
    let config = config.to_str().unwrap();

    let result = ctrack(dir.path(), &["config", "get", "tracker.reconcile_interval_secs", "--config", config])?;
    assert!(result.success(), "stderr: {}", result.stderr);
    assert_eq!(result.stdout.trim(), "7");

    let result = ctrack(dir.path(), &["config", "get", "nope", "--config", config])?;
    assert!(!result.success());

    let result = ctrack(dir.path(), &["config", "example"])?;
    assert!(result.success());
    assert!(result.stdout.contains("[baseline]"));
    Ok(())
}
