//! File change events

use std::fmt;
use std::path::{Path, PathBuf};

/// Type of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File created
    Create,
    /// File contents changed
    Change,
    /// File deleted
    Delete,
    /// File renamed (path is the new location)
    Rename,
}

/// A single filesystem notification
///
/// Immutable once built. `old_path` is only present on renames where the
/// watcher reported both ends of the move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub old_path: Option<PathBuf>,
}

impl FileChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Create, path)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Change, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Delete, path)
    }

    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Rename,
            path: to.into(),
            old_path: Some(from.into()),
        }
    }

    /// Every path this event touches (the old location first for renames)
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.old_path
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.path.as_path()))
    }
}

impl fmt::Display for FileChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old) => write!(
                f,
                "{:?} {} -> {}",
                self.kind,
                old.display(),
                self.path.display()
            ),
            None => write!(f, "{:?} {}", self.kind, self.path.display()),
        }
    }
}
