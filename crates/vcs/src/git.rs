//! Git facade
//!
//! [`GitService`] is the narrow set of version-control queries the change
//! detector needs. [`GitCli`] implements it by running the `git` executable
//! through `tokio::process`, so every call is a suspension point rather than
//! a blocking wait.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{trace, warn};

/// Errors from the version-control backend
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {args} exited with {status}: {stderr}")]
    Command {
        args: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected git output for {args}: {output}")]
    Parse { args: String, output: String },
}

pub type Result<T> = std::result::Result<T, GitError>;

/// Version-control queries used by the detector
///
/// Paths returned by the listing methods are relative to the repository root.
#[async_trait]
pub trait GitService: Send + Sync {
    /// Whether `root` is the top of a working copy
    fn is_repository(&self, root: &Path) -> bool {
        root.join(".git").exists()
    }

    /// Commit id of HEAD, `None` on an unborn branch
    async fn head(&self, root: &Path) -> Result<Option<String>>;

    /// Commit id a ref points at, `None` when the ref does not exist
    async fn resolve(&self, root: &Path, reference: &str) -> Result<Option<String>>;

    /// Best common ancestor of two commits, `None` for unrelated histories
    async fn merge_base(&self, root: &Path, a: &str, b: &str) -> Result<Option<String>>;

    /// Number of commits reachable from `to` but not from `from`
    async fn distance(&self, root: &Path, from: &str, to: &str) -> Result<u64>;

    /// Files whose working-tree content differs from `base`, deletions excluded
    async fn changed_paths(&self, root: &Path, base: &str) -> Result<Vec<PathBuf>>;

    /// Untracked files not excluded by git's own ignore rules
    async fn untracked_paths(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// [`GitService`] backed by the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, root: &Path, args: &[&str]) -> Result<Output> {
        trace!(root = %root.display(), args = ?args, "Running git");
        Command::new(&self.program)
            .arg("-C")
            .arg(root)
            .args(args)
            // Read-only queries must not contend for the index lock
            .env("GIT_OPTIONAL_LOCKS", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(GitError::Spawn)
    }

    /// Run and require exit status 0
    async fn run_ok(&self, root: &Path, args: &[&str]) -> Result<Output> {
        let output = self.run(root, args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(command_error(args, &output))
        }
    }

    /// Run a query where exit status 1 means "no answer"
    async fn run_optional(&self, root: &Path, args: &[&str]) -> Result<Option<String>> {
        let output = self.run(root, args).await?;
        if output.status.success() {
            let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Ok((!value.is_empty()).then_some(value));
        }
        if output.status.code() == Some(1) {
            return Ok(None);
        }
        Err(command_error(args, &output))
    }

    async fn rev_parse(&self, root: &Path, spec: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", spec);
        self.run_optional(root, &["rev-parse", "--verify", "--quiet", &spec])
            .await
    }
}

#[async_trait]
impl GitService for GitCli {
    async fn head(&self, root: &Path) -> Result<Option<String>> {
        self.rev_parse(root, "HEAD").await
    }

    async fn resolve(&self, root: &Path, reference: &str) -> Result<Option<String>> {
        self.rev_parse(root, reference).await
    }

    async fn merge_base(&self, root: &Path, a: &str, b: &str) -> Result<Option<String>> {
        self.run_optional(root, &["merge-base", a, b]).await
    }

    async fn distance(&self, root: &Path, from: &str, to: &str) -> Result<u64> {
        let range = format!("{}..{}", from, to);
        let args = ["rev-list", "--count", range.as_str()];
        let output = self.run_ok(root, &args).await?;
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        text.parse().map_err(|_| GitError::Parse {
            args: args.join(" "),
            output: text,
        })
    }

    async fn changed_paths(&self, root: &Path, base: &str) -> Result<Vec<PathBuf>> {
        let output = self
            .run_ok(
                root,
                &[
                    "diff",
                    "--name-only",
                    "-z",
                    "--no-renames",
                    "--diff-filter=d",
                    base,
                    "--",
                ],
            )
            .await?;
        Ok(split_paths(&output.stdout))
    }

    async fn untracked_paths(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let output = self
            .run_ok(root, &["ls-files", "--others", "--exclude-standard", "-z"])
            .await?;
        Ok(split_paths(&output.stdout))
    }
}

fn command_error(args: &[&str], output: &Output) -> GitError {
    GitError::Command {
        args: args.join(" "),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Split NUL-separated path output, skipping non UTF-8 names
fn split_paths(stdout: &[u8]) -> Vec<PathBuf> {
    stdout
        .split(|b| *b == 0)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match std::str::from_utf8(entry) {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => {
                warn!(path = %String::from_utf8_lossy(entry), "Skipping non UTF-8 path from git");
                None
            }
        })
        .collect()
}
