//! Change tracker coordination
//!
//! Two paths update the tracked set:
//! - Live: filesystem events are batched by an [`EventQueueProcessor`] and
//!   applied one by one (add on create/change, remove on delete, both on
//!   rename). Cheap, but only as accurate as the watcher.
//! - Reconcile: a [`DroppingExecutor`] periodically runs the change detector
//!   and replaces the set with its result. Authoritative, last writer wins.
//!
//! Both paths filter through the same cached ignore rules and supported-file
//! check, so the set never holds a path either of them rejects. Reconciles
//! run one at a time, whichever caller started them.

use crate::set::TrackedFiles;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ct_core::collab::{NoOpenFiles, NoSavedFiles};
use ct_core::{
    ChangeKind, ExtensionChecker, FileChangeEvent, IgnoreRules, OpenFilesObserver,
    SavedFilesTracker, SupportedFileChecker, TrackerConfig,
};
use ignore::WalkBuilder;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use vcs::{Baseline, ChangeDetector, GitCli, GitService};
use watcher::{DroppingExecutor, EventHandler, EventQueueProcessor, FsWatcher};

/// Receives the sorted tracked set whenever its contents change
pub type ChangeCallback = Arc<dyn Fn(&[PathBuf]) + Send + Sync>;

/// Builder for [`ChangeTracker`]
pub struct ChangeTrackerBuilder {
    root: PathBuf,
    config: TrackerConfig,
    git: Option<Arc<dyn GitService>>,
    supported: Option<Arc<dyn SupportedFileChecker>>,
    saved: Option<Arc<dyn SavedFilesTracker>>,
    open: Option<Arc<dyn OpenFilesObserver>>,
    on_change: Option<ChangeCallback>,
    watch_filesystem: bool,
}

impl ChangeTrackerBuilder {
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Version-control backend (default: the `git` executable)
    pub fn git(mut self, git: Arc<dyn GitService>) -> Self {
        self.git = Some(git);
        self
    }

    /// Supported-file predicate (default: configured extensions)
    pub fn supported(mut self, supported: Arc<dyn SupportedFileChecker>) -> Self {
        self.supported = Some(supported);
        self
    }

    pub fn saved_files(mut self, saved: Arc<dyn SavedFilesTracker>) -> Self {
        self.saved = Some(saved);
        self
    }

    pub fn open_files(mut self, open: Arc<dyn OpenFilesObserver>) -> Self {
        self.open = Some(open);
        self
    }

    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[PathBuf]) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Subscribe to OS file notifications on start (default: true)
    ///
    /// Hosts with their own watcher turn this off and feed
    /// [`ChangeTracker::enqueue`] instead.
    pub fn watch_filesystem(mut self, watch: bool) -> Self {
        self.watch_filesystem = watch;
        self
    }

    pub fn build(self) -> Result<ChangeTracker> {
        self.config.validate()?;

        let root = std::fs::canonicalize(&self.root).unwrap_or(self.root);
        let git = self.git.unwrap_or_else(|| Arc::new(GitCli::new()));
        let supported = self
            .supported
            .unwrap_or_else(|| Arc::new(ExtensionChecker::new(&self.config.files.extensions)));
        let detector = ChangeDetector::new(git, supported, &self.config);
        let rules = detector
            .load_rules(&root)
            .context("Failed to load ignore rules")?;

        let inner = Arc::new(Inner {
            root,
            detector,
            saved: self.saved.unwrap_or_else(|| Arc::new(NoSavedFiles)),
            open: self.open.unwrap_or_else(|| Arc::new(NoOpenFiles)),
            rules: RwLock::new(rules),
            files: TrackedFiles::default(),
            reconcile_pass: tokio::sync::Mutex::new(()),
            on_change: self.on_change,
        });

        let queue = EventQueueProcessor::new(inner.clone());

        let reconciler = Arc::clone(&inner);
        let executor = DroppingExecutor::builder()
            .name("reconcile")
            .interval(self.config.tracker.reconcile_interval())
            .action(move || {
                let inner = Arc::clone(&reconciler);
                async move {
                    inner.reconcile().await;
                }
            })
            .build()?;

        Ok(ChangeTracker {
            inner,
            queue,
            executor,
            watcher: Mutex::new(None),
            started: AtomicBool::new(false),
            watch_filesystem: self.watch_filesystem,
            queue_interval: self.config.tracker.queue_interval(),
        })
    }
}

struct Inner {
    root: PathBuf,
    detector: ChangeDetector,
    saved: Arc<dyn SavedFilesTracker>,
    open: Arc<dyn OpenFilesObserver>,
    rules: RwLock<IgnoreRules>,
    files: TrackedFiles,
    // Held across a whole reconcile so an older detection never lands last
    reconcile_pass: tokio::sync::Mutex<()>,
    on_change: Option<ChangeCallback>,
}

impl Inner {
    async fn changed_files_vs_baseline(&self) -> HashSet<PathBuf> {
        self.detector
            .changed_files_vs_baseline(&self.root, self.saved.as_ref(), self.open.as_ref())
            .await
    }

    /// Replace the tracked set with a fresh detection pass
    async fn reconcile(&self) -> bool {
        let _pass = self.reconcile_pass.lock().await;

        let reloaded = self.rules.write().reload();
        if let Err(e) = reloaded {
            warn!(error = %e, "Failed to reload ignore rules, keeping previous rules");
        }

        let files = self.changed_files_vs_baseline().await;
        let count = files.len();
        let updated = self.files.replace(files);

        if updated {
            info!(count, "Tracked files reconciled");
            self.notify();
        } else {
            debug!(count, "Reconcile found no difference");
        }
        updated
    }

    /// Apply one live event, returning whether the tracked set changed
    fn apply(&self, event: &FileChangeEvent) -> Result<bool> {
        let mut updated = false;

        let touches_rules = {
            let rules = self.rules.read();
            event.paths().any(|path| rules.is_rule_file(path))
        };
        if touches_rules {
            updated |= self.reload_rules()?;
        }

        let rules = self.rules.read();

        let removed: Vec<&Path> = match event.kind {
            ChangeKind::Delete => vec![event.path.as_path()],
            ChangeKind::Rename => event.old_path.as_deref().into_iter().collect(),
            ChangeKind::Create | ChangeKind::Change => Vec::new(),
        };

        let added: Vec<PathBuf> = match event.kind {
            ChangeKind::Delete => Vec::new(),
            _ if event.path.is_dir() => self.files_under(&rules, &event.path),
            _ => Some(event.path.clone())
                .filter(|path| path.is_file() && self.detector.is_eligible(&rules, path))
                .into_iter()
                .collect(),
        };

        let host = self.detector.host_files(
            &self.root,
            &rules,
            self.saved.as_ref(),
            self.open.as_ref(),
        );

        updated |= self.files.update(|set| {
            let before = set.len();
            for gone in &removed {
                set.retain(|path| !path.starts_with(gone));
            }
            let mut updated = set.len() != before;
            for path in added {
                updated |= set.insert(path);
            }
            for path in host {
                updated |= set.insert(path);
            }
            updated
        });

        trace!(event = %event, updated, "Applied file change event");
        Ok(updated)
    }

    /// Eligible files below a directory that arrived by create or rename
    fn files_under(&self, rules: &IgnoreRules, dir: &Path) -> Vec<PathBuf> {
        let files: Vec<PathBuf> = WalkBuilder::new(dir)
            .standard_filters(false)
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| self.detector.is_eligible(rules, path))
            .collect();

        trace!(dir = %dir.display(), count = files.len(), "Expanded directory event");
        files
    }

    /// Re-read the ignore files and drop newly ignored paths
    fn reload_rules(&self) -> Result<bool> {
        debug!("Ignore rules changed, reloading");
        let mut rules = self.rules.write();
        rules.reload()?;

        let pruned = self.files.update(|set| {
            let before = set.len();
            set.retain(|path| !rules.should_ignore(path));
            set.len() != before
        });
        Ok(pruned)
    }

    fn notify(&self) {
        if let Some(callback) = &self.on_change {
            callback(&self.files.snapshot());
        }
    }
}

#[async_trait]
impl EventHandler for Inner {
    async fn changed_files(&self) -> Result<HashSet<PathBuf>> {
        Ok(self.files.to_set())
    }

    async fn process_event(
        &self,
        event: &FileChangeEvent,
        _changed: &HashSet<PathBuf>,
    ) -> Result<()> {
        // Events apply against the live set, not the batch snapshot, so a
        // delete followed by a re-create in one batch lands correctly
        if self.apply(event)? {
            self.notify();
        }
        Ok(())
    }
}

/// Keeps the set of files changed vs the baseline up to date
///
/// Dropping the tracker stops the watcher, the queue and the reconcile
/// schedule. Work already in flight finishes on its own.
pub struct ChangeTracker {
    inner: Arc<Inner>,
    queue: EventQueueProcessor,
    executor: DroppingExecutor,
    watcher: Mutex<Option<FsWatcher>>,
    started: AtomicBool,
    watch_filesystem: bool,
    queue_interval: Duration,
}

impl ChangeTracker {
    pub fn builder(root: impl Into<PathBuf>) -> ChangeTrackerBuilder {
        ChangeTrackerBuilder {
            root: root.into(),
            config: TrackerConfig::default(),
            git: None,
            supported: None,
            saved: None,
            open: None,
            on_change: None,
            watch_filesystem: true,
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Arm the watcher, the queue and the reconcile schedule
    ///
    /// Also runs one reconciliation right away. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!(root = %self.root().display(), "Change tracker already started");
            return Ok(());
        }

        if let Err(e) = self.arm() {
            self.disarm();
            self.started.store(false, Ordering::Release);
            return Err(e);
        }

        info!(root = %self.root().display(), "Change tracker started");
        Ok(())
    }

    fn arm(&self) -> Result<()> {
        if self.watch_filesystem {
            let watcher = FsWatcher::watch(self.root(), self.queue.sink())
                .context("Failed to watch repository")?;
            *self.watcher.lock() = Some(watcher);
        }

        self.queue.start(self.queue_interval)?;
        self.executor.start()?;
        self.executor.trigger()?;
        Ok(())
    }

    fn disarm(&self) {
        self.watcher.lock().take();
        self.queue.stop();
        self.executor.stop();
    }

    /// Disarm everything `start` armed. No-op when not started.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::AcqRel) {
            return;
        }
        self.disarm();
        info!(root = %self.root().display(), "Change tracker stopped");
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Live view of the tracked set
    pub fn tracked(&self) -> TrackedFiles {
        self.inner.files.clone()
    }

    /// Recompute the changed files without touching the tracked set
    pub async fn changed_files_vs_baseline(&self) -> HashSet<PathBuf> {
        self.inner.changed_files_vs_baseline().await
    }

    pub async fn baseline(&self) -> Option<Baseline> {
        self.inner.detector.baseline(self.root()).await
    }

    /// Run one reconciliation on the caller's task
    ///
    /// Waits for a scheduled reconcile already in progress. Returns whether
    /// the tracked set changed.
    pub async fn reconcile_now(&self) -> bool {
        self.inner.reconcile().await
    }

    /// Apply queued events now, returning how many were handled
    pub async fn flush_events(&self) -> usize {
        self.queue.flush().await
    }

    /// Feed an event from a host-owned watcher
    pub fn enqueue(&self, event: FileChangeEvent) {
        self.queue.enqueue(event);
    }
}

impl Drop for ChangeTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
