//! Scriptable [`GitService`] for tests
//!
//! Candidates are registered as `reference → tip → merge-base (distance)`.
//! Diff output and failures can be changed while a test runs.

use crate::git::{GitError, GitService, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct State {
    head: Option<String>,
    refs: HashMap<String, String>,
    bases: HashMap<String, String>,
    distances: HashMap<String, u64>,
    changed: Vec<PathBuf>,
    untracked: Vec<PathBuf>,
    diff_delays: VecDeque<Duration>,
    fail_diff: bool,
    fail_merge_base: bool,
}

/// In-memory git double
#[derive(Default)]
pub struct FakeGit {
    state: Mutex<State>,
    diff_calls: AtomicUsize,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head(self, head: &str) -> Self {
        self.state.lock().head = Some(head.to_string());
        self
    }

    /// Repository with HEAD `head` and a single `main` candidate at distance 0
    pub fn on_main() -> Self {
        let git = Self::new().with_head("head");
        git.add_candidate("main", "main-tip", "base", 0);
        git
    }

    pub fn set_head(&self, head: Option<&str>) {
        self.state.lock().head = head.map(str::to_string);
    }

    pub fn add_candidate(&self, reference: &str, tip: &str, base: &str, distance: u64) {
        let mut state = self.state.lock();
        state.refs.insert(reference.to_string(), tip.to_string());
        state.bases.insert(tip.to_string(), base.to_string());
        state.distances.insert(base.to_string(), distance);
    }

    /// Paths (relative to the root) reported as changed vs the baseline
    pub fn set_changed<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.state.lock().changed = paths.into_iter().map(Into::into).collect();
    }

    /// Paths (relative to the root) reported as untracked
    pub fn set_untracked<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.state.lock().untracked = paths.into_iter().map(Into::into).collect();
    }

    pub fn fail_diff(&self, fail: bool) {
        self.state.lock().fail_diff = fail;
    }

    pub fn fail_merge_base(&self, fail: bool) {
        self.state.lock().fail_merge_base = fail;
    }

    /// Hold the next diff answer back for `delay`
    ///
    /// The answer is read before the wait, so a slow call reports what was
    /// scripted when it started.
    pub fn delay_next_diff(&self, delay: Duration) {
        self.state.lock().diff_delays.push_back(delay);
    }

    /// Number of diff calls made so far
    pub fn diff_calls(&self) -> usize {
        self.diff_calls.load(Ordering::SeqCst)
    }
}

fn injected(what: &str) -> GitError {
    GitError::Command {
        args: what.to_string(),
        status: "exit status: 128".to_string(),
        stderr: "injected failure".to_string(),
    }
}

#[async_trait]
impl GitService for FakeGit {
    async fn head(&self, _root: &Path) -> Result<Option<String>> {
        Ok(self.state.lock().head.clone())
    }

    async fn resolve(&self, _root: &Path, reference: &str) -> Result<Option<String>> {
        Ok(self.state.lock().refs.get(reference).cloned())
    }

    async fn merge_base(&self, _root: &Path, _a: &str, b: &str) -> Result<Option<String>> {
        let state = self.state.lock();
        if state.fail_merge_base {
            return Err(injected("merge-base"));
        }
        Ok(state.bases.get(b).cloned())
    }

    async fn distance(&self, _root: &Path, from: &str, _to: &str) -> Result<u64> {
        Ok(self.state.lock().distances.get(from).copied().unwrap_or(0))
    }

    async fn changed_paths(&self, _root: &Path, _base: &str) -> Result<Vec<PathBuf>> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        let (answer, delay) = {
            let mut state = self.state.lock();
            let answer = if state.fail_diff {
                Err(injected("diff"))
            } else {
                Ok(state.changed.clone())
            };
            (answer, state.diff_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }

    async fn untracked_paths(&self, _root: &Path) -> Result<Vec<PathBuf>> {
        Ok(self.state.lock().untracked.clone())
    }
}
