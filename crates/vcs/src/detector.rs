//! Change detection against the baseline
//!
//! One pass resolves the baseline, lists everything that differs from it
//! (committed, staged, unstaged and untracked) and keeps only the paths that
//! survive the ignore rules and the supported-file predicate. Files the host
//! reports as saved or open are folded in under the same filters.
//!
//! Nothing is cached between passes: the baseline and the ignore rules are
//! recomputed every time, so branch switches and rule edits are picked up by
//! the next call.

use crate::baseline::{find_baseline, Baseline};
use crate::git::{GitError, GitService};
use ct_core::config::IgnoreConfig;
use ct_core::{
    IgnoreRules, OpenFilesObserver, SavedFilesTracker, SupportedFileChecker, TrackerConfig,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
enum DetectError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Rules(#[from] ct_core::Error),
}

/// Computes the set of changed files for a repository
pub struct ChangeDetector {
    git: Arc<dyn GitService>,
    supported: Arc<dyn SupportedFileChecker>,
    candidates: Vec<String>,
    ignore: IgnoreConfig,
}

impl ChangeDetector {
    pub fn new(
        git: Arc<dyn GitService>,
        supported: Arc<dyn SupportedFileChecker>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            git,
            supported,
            candidates: config.baseline.candidates.clone(),
            ignore: config.ignore.clone(),
        }
    }

    /// Baseline candidates in priority order
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Whether `root` names an existing repository working copy
    pub fn is_valid_root(&self, root: &Path) -> bool {
        !root.as_os_str().is_empty() && root.is_dir() && self.git.is_repository(root)
    }

    /// Read the ignore rules for `root` from disk
    pub fn load_rules(&self, root: &Path) -> ct_core::Result<IgnoreRules> {
        IgnoreRules::load(root, &self.ignore)
    }

    /// Whether `path` passes both the ignore rules and the supported-file check
    pub fn is_eligible(&self, rules: &IgnoreRules, path: &Path) -> bool {
        !rules.should_ignore(path) && self.supported.is_supported(path)
    }

    /// Current baseline, `None` when it cannot be determined
    pub async fn baseline(&self, root: &Path) -> Option<Baseline> {
        if !self.is_valid_root(root) {
            return None;
        }

        match find_baseline(self.git.as_ref(), root, &self.candidates).await {
            Ok(Some(baseline)) => Some(baseline),
            Ok(None) => {
                debug!(root = %root.display(), "could not determine merge base");
                None
            }
            Err(e) => {
                debug!(root = %root.display(), error = %e, "could not determine merge base");
                None
            }
        }
    }

    /// Files changed relative to the baseline, plus eligible saved/open files
    ///
    /// Never fails: an invalid root or missing baseline yields an empty set,
    /// and backend errors are logged and also yield an empty set.
    pub async fn changed_files_vs_baseline(
        &self,
        root: &Path,
        saved: &dyn SavedFilesTracker,
        open: &dyn OpenFilesObserver,
    ) -> HashSet<PathBuf> {
        if !self.is_valid_root(root) {
            debug!(root = %root.display(), "Not a repository root, nothing changed");
            return HashSet::new();
        }

        match self.detect(root, saved, open).await {
            Ok(files) => files,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "error getting changed files");
                HashSet::new()
            }
        }
    }

    async fn detect(
        &self,
        root: &Path,
        saved: &dyn SavedFilesTracker,
        open: &dyn OpenFilesObserver,
    ) -> Result<HashSet<PathBuf>, DetectError> {
        let Some(baseline) = self.baseline(root).await else {
            return Ok(HashSet::new());
        };

        let mut listed = self.git.changed_paths(root, &baseline.commit).await?;
        listed.extend(self.git.untracked_paths(root).await?);

        let rules = self.load_rules(root)?;

        let mut files: HashSet<PathBuf> = listed
            .into_iter()
            .map(|rel| root.join(rel))
            .filter(|path| self.is_eligible(&rules, path))
            .collect();
        let from_git = files.len();

        files.extend(self.host_files(root, &rules, saved, open));

        debug!(
            baseline = %baseline,
            from_git,
            total = files.len(),
            "Computed changed files"
        );

        Ok(files)
    }

    /// Saved and open files that exist under `root` and pass the filters
    pub fn host_files(
        &self,
        root: &Path,
        rules: &IgnoreRules,
        saved: &dyn SavedFilesTracker,
        open: &dyn OpenFilesObserver,
    ) -> Vec<PathBuf> {
        saved
            .saved_files()
            .into_iter()
            .chain(open.visible_files())
            .map(|path| if path.is_absolute() { path } else { root.join(path) })
            .filter(|path| path.starts_with(root) && path.is_file())
            .filter(|path| self.is_eligible(rules, path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGit;
    use ct_core::collab::{NoOpenFiles, NoSavedFiles};
    use ct_core::testing::capture_logs;
    use ct_core::{ExtensionChecker, OpenFiles, SavedFiles};
    use std::fs;
    use tempfile::TempDir;
    use tracing::Level;

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        dir
    }

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "x").unwrap();
        path
    }

    fn detector(git: Arc<FakeGit>) -> ChangeDetector {
        ChangeDetector::new(
            git,
            Arc::new(ExtensionChecker::default()),
            &TrackerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_roots_yield_empty_set() {
        let git = Arc::new(FakeGit::on_main());
        git.set_changed(["a.ts"]);
        let detector = detector(git.clone());

        let plain = TempDir::new().unwrap();
        for root in [
            Path::new(""),
            Path::new("/definitely/not/here"),
            plain.path(),
        ] {
            let files = detector
                .changed_files_vs_baseline(root, &NoSavedFiles, &NoOpenFiles)
                .await;
            assert!(files.is_empty());
        }
        assert_eq!(git.diff_calls(), 0);
    }

    #[tokio::test]
    async fn test_diff_failure_logs_one_warning() {
        let dir = repo();
        let git = Arc::new(FakeGit::on_main());
        git.fail_diff(true);
        let detector = detector(git.clone());

        let (logs, _guard) = capture_logs();
        let files = detector
            .changed_files_vs_baseline(dir.path(), &NoSavedFiles, &NoOpenFiles)
            .await;

        assert!(files.is_empty());
        assert_eq!(git.diff_calls(), 1);
        assert_eq!(logs.count(Level::WARN, "error getting changed files"), 1);
        assert_eq!(logs.count_level(Level::WARN), 1);
    }

    #[tokio::test]
    async fn test_absent_baseline_yields_empty_set() {
        let dir = repo();
        touch(dir.path(), "src/saved.ts");
        let git = Arc::new(FakeGit::new().with_head("head"));
        git.set_changed(["src/a.ts"]);
        let detector = detector(git.clone());

        let saved = SavedFiles::new();
        saved.record(dir.path().join("src/saved.ts"));

        let (logs, _guard) = capture_logs();
        let files = detector
            .changed_files_vs_baseline(dir.path(), &saved, &NoOpenFiles)
            .await;

        assert!(files.is_empty());
        assert_eq!(git.diff_calls(), 0);
        assert_eq!(logs.count(Level::DEBUG, "could not determine merge base"), 1);
        assert_eq!(logs.count_level(Level::WARN), 0);
    }

    #[tokio::test]
    async fn test_merge_base_failure_is_debug_only() {
        let dir = repo();
        let git = Arc::new(FakeGit::on_main());
        git.fail_merge_base(true);
        let detector = detector(git);

        let (logs, _guard) = capture_logs();
        assert!(detector.baseline(dir.path()).await.is_none());
        assert_eq!(logs.count(Level::DEBUG, "could not determine merge base"), 1);
        assert_eq!(logs.count_level(Level::WARN), 0);
    }

    #[tokio::test]
    async fn test_filters_ignored_and_unsupported() {
        let dir = repo();
        fs::write(dir.path().join(".gitignore"), "dist/\n").unwrap();
        let git = Arc::new(FakeGit::on_main());
        git.set_changed(["src/a.ts", "dist/bundle.js", "README.md", "node_modules/x/i.js"]);
        git.set_untracked(["src/new.ts", "notes.txt"]);
        let detector = detector(git);

        let files = detector
            .changed_files_vs_baseline(dir.path(), &NoSavedFiles, &NoOpenFiles)
            .await;

        let expected: HashSet<PathBuf> = ["src/a.ts", "src/new.ts"]
            .iter()
            .map(|rel| dir.path().join(rel))
            .collect();
        assert_eq!(files, expected);
    }

    #[tokio::test]
    async fn test_ignore_rules_reread_every_call() {
        let dir = repo();
        let git = Arc::new(FakeGit::on_main());
        git.set_changed(["a.ts", "b.ts"]);
        let detector = detector(git);

        let files = detector
            .changed_files_vs_baseline(dir.path(), &NoSavedFiles, &NoOpenFiles)
            .await;
        assert_eq!(files.len(), 2);

        fs::write(dir.path().join(".gitignore"), "a.ts\n").unwrap();
        let files = detector
            .changed_files_vs_baseline(dir.path(), &NoSavedFiles, &NoOpenFiles)
            .await;
        assert_eq!(files.len(), 1);
        assert!(files.contains(&dir.path().join("b.ts")));
    }

    #[tokio::test]
    async fn test_saved_and_open_files_unioned() {
        let dir = repo();
        let root = dir.path();
        fs::write(root.join(".gitignore"), "dist/\n").unwrap();
        let saved_ts = touch(root, "src/saved.ts");
        let open_ts = touch(root, "src/open.ts");
        let ignored = touch(root, "dist/out.ts");
        let unsupported = touch(root, "notes.txt");

        let git = Arc::new(FakeGit::on_main());
        git.set_changed(["src/a.ts"]);
        let detector = detector(git);

        let saved = SavedFiles::new();
        saved.record(&saved_ts);
        saved.record(root.join("src/missing.ts"));
        saved.record("/somewhere/else/x.ts");
        saved.record(&unsupported);

        let open = OpenFiles::new();
        open.open(&open_ts);
        open.open(&ignored);

        let files = detector.changed_files_vs_baseline(root, &saved, &open).await;

        let expected: HashSet<PathBuf> = [root.join("src/a.ts"), saved_ts, open_ts]
            .into_iter()
            .collect();
        assert_eq!(files, expected);
    }

    #[tokio::test]
    async fn test_baseline_exposed() {
        let dir = repo();
        let detector = detector(Arc::new(FakeGit::on_main()));

        let baseline = detector.baseline(dir.path()).await.unwrap();
        assert_eq!(baseline.reference, "main");
        assert_eq!(baseline.commit, "base");
    }
}
