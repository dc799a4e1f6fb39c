//! The tracked file set

use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared, read-only view of the files believed changed vs the baseline
///
/// Clones share the same underlying set. Only the coordinator mutates it.
#[derive(Debug, Clone, Default)]
pub struct TrackedFiles {
    inner: Arc<RwLock<HashSet<PathBuf>>>,
}

impl TrackedFiles {
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().contains(path)
    }

    /// Sorted copy of the current contents
    pub fn snapshot(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.inner.read().iter().cloned().collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub(crate) fn to_set(&self) -> HashSet<PathBuf> {
        self.inner.read().clone()
    }

    /// Swap in `files`, returning whether the contents differ
    pub(crate) fn replace(&self, files: HashSet<PathBuf>) -> bool {
        let mut current = self.inner.write();
        if *current == files {
            return false;
        }
        *current = files;
        true
    }

    /// Mutate under the write lock; `f` reports whether it changed anything
    pub(crate) fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut HashSet<PathBuf>) -> bool,
    {
        f(&mut self.inner.write())
    }
}
