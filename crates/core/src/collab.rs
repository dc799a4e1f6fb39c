//! Collaborator interfaces consumed by the tracker
//!
//! The host environment supplies these signals. Each trait ships with a
//! simple in-memory implementation that hosts (and tests) can drive directly.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Decides whether a path is eligible for tracking
pub trait SupportedFileChecker: Send + Sync {
    fn is_supported(&self, path: &Path) -> bool;
}

/// Files explicitly saved since the last baseline sync
pub trait SavedFilesTracker: Send + Sync {
    fn saved_files(&self) -> HashSet<PathBuf>;
}

/// Files currently open or visible in the host
pub trait OpenFilesObserver: Send + Sync {
    fn visible_files(&self) -> HashSet<PathBuf>;
}

/// Extensions supported out of the box
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "java", "kt", "kts", "scala",
    "c", "h", "cc", "cpp", "cxx", "hpp", "cs", "rb", "php", "swift", "m", "mm", "vue",
    "dart", "ex", "exs", "erl", "clj", "groovy", "tf", "sql", "sh",
];

/// Extension based [`SupportedFileChecker`]
///
/// Matching is case-insensitive: `Main.TS` is supported when `ts` is.
#[derive(Debug, Clone)]
pub struct ExtensionChecker {
    extensions: HashSet<String>,
}

impl ExtensionChecker {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for ExtensionChecker {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

impl SupportedFileChecker for ExtensionChecker {
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }
}

/// In-memory saved files set
///
/// Append-only until [`SavedFiles::clear`] is called by the host (typically
/// after the baseline has been synced).
#[derive(Debug, Default)]
pub struct SavedFiles {
    paths: RwLock<HashSet<PathBuf>>,
}

impl SavedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: impl Into<PathBuf>) {
        self.paths.write().insert(path.into());
    }

    pub fn clear(&self) {
        self.paths.write().clear();
    }
}

impl SavedFilesTracker for SavedFiles {
    fn saved_files(&self) -> HashSet<PathBuf> {
        self.paths.read().clone()
    }
}

/// In-memory open files set
#[derive(Debug, Default)]
pub struct OpenFiles {
    paths: RwLock<HashSet<PathBuf>>,
}

impl OpenFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, path: impl Into<PathBuf>) {
        self.paths.write().insert(path.into());
    }

    pub fn close(&self, path: &Path) {
        self.paths.write().remove(path);
    }

    /// Replace the whole visible set (hosts that report full snapshots)
    pub fn replace<I>(&self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        *self.paths.write() = paths.into_iter().collect();
    }
}

impl OpenFilesObserver for OpenFiles {
    fn visible_files(&self) -> HashSet<PathBuf> {
        self.paths.read().clone()
    }
}

/// Observer that never reports anything, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpenFiles;

impl OpenFilesObserver for NoOpenFiles {
    fn visible_files(&self) -> HashSet<PathBuf> {
        HashSet::new()
    }
}

/// Tracker that never reports anything, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSavedFiles;

impl SavedFilesTracker for NoSavedFiles {
    fn saved_files(&self) -> HashSet<PathBuf> {
        HashSet::new()
    }
}
