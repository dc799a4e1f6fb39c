//! `notify` adapter
//!
//! Translates raw `notify` events into [`FileChangeEvent`]s and hands them to
//! a sink. The sink runs on notify's thread, so it must not block; pairing it
//! with [`crate::EventQueueProcessor::sink`] satisfies that.

use ct_core::FileChangeEvent;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{info, trace, warn};

/// Errors that can occur in the watcher
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("Failed to watch path {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Recursive filesystem subscription
///
/// Dropping the watcher ends the subscription.
pub struct FsWatcher {
    root: PathBuf,
    // Must be held to keep the OS watch alive
    _inner: RecommendedWatcher,
}

impl FsWatcher {
    /// Watch `root` recursively, forwarding translated events to `sink`
    pub fn watch<F>(root: &Path, sink: F) -> Result<Self, WatchError>
    where
        F: Fn(FileChangeEvent) + Send + Sync + 'static,
    {
        let mut inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in translate(&event) {
                        sink(change);
                    }
                }
                Err(e) => warn!(error = %e, "Watcher error"),
            },
            Config::default(),
        )
        .map_err(WatchError::Init)?;

        inner
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: root.to_path_buf(),
                source,
            })?;

        info!(root = %root.display(), "File watcher initialized");

        Ok(Self {
            root: root.to_path_buf(),
            _inner: inner,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map one notify event to zero or more change events
///
/// Access notifications and most directory events are dropped. A rename
/// reported with both ends becomes a single `Rename`, directories included,
/// so the old prefix is pruned and the new one expanded downstream. Half
/// renames become a delete (old side) or a create (new side, which may be a
/// directory moved in whole).
pub fn translate(event: &Event) -> Vec<FileChangeEvent> {
    match event.kind {
        EventKind::Create(_) => files(event).map(FileChangeEvent::created).collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => {
            vec![FileChangeEvent::renamed(event.paths[0].clone(), event.paths[1].clone())]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().cloned().map(FileChangeEvent::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().cloned().map(FileChangeEvent::created).collect()
        }
        // Generic rename: whichever side still exists is the new location
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(|p| {
                if p.exists() {
                    FileChangeEvent::created(p.clone())
                } else {
                    FileChangeEvent::deleted(p.clone())
                }
            })
            .collect(),
        EventKind::Modify(_) => files(event).map(FileChangeEvent::changed).collect(),

        EventKind::Remove(_) => event.paths.iter().cloned().map(FileChangeEvent::deleted).collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => {
            trace!(kind = ?event.kind, "Ignoring event");
            Vec::new()
        }
    }
}

fn files(event: &Event) -> impl Iterator<Item = PathBuf> + '_ {
    event.paths.iter().filter(|p| !p.is_dir()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::ChangeKind;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn test_basic_kinds() {
        let created = translate(&event(EventKind::Create(CreateKind::File), &["/repo/a.ts"]));
        assert_eq!(created, vec![FileChangeEvent::created("/repo/a.ts")]);

        let changed = translate(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/repo/a.ts"],
        ));
        assert_eq!(changed, vec![FileChangeEvent::changed("/repo/a.ts")]);

        let removed = translate(&event(EventKind::Remove(RemoveKind::File), &["/repo/a.ts"]));
        assert_eq!(removed, vec![FileChangeEvent::deleted("/repo/a.ts")]);
    }

    #[test]
    fn test_rename_both() {
        let renamed = translate(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/repo/old.ts", "/repo/new.ts"],
        ));
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].kind, ChangeKind::Rename);
        assert_eq!(renamed[0].old_path.as_deref(), Some(Path::new("/repo/old.ts")));
        assert_eq!(renamed[0].path, PathBuf::from("/repo/new.ts"));
    }

    #[test]
    fn test_half_renames() {
        let from = translate(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/repo/old.ts"],
        ));
        assert_eq!(from, vec![FileChangeEvent::deleted("/repo/old.ts")]);

        let to = translate(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/repo/new.ts"],
        ));
        assert_eq!(to, vec![FileChangeEvent::created("/repo/new.ts")]);
    }

    #[test]
    fn test_directory_rename_kept() {
        let temp = tempfile::TempDir::new().unwrap();
        let old = temp.path().join("d");
        let new = temp.path().join("e");
        std::fs::create_dir(&new).unwrap();

        let renamed = translate(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &[old.to_str().unwrap(), new.to_str().unwrap()],
        ));
        assert_eq!(renamed, vec![FileChangeEvent::renamed(&old, &new)]);

        let moved_in = translate(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &[new.to_str().unwrap()],
        ));
        assert_eq!(moved_in, vec![FileChangeEvent::created(&new)]);
    }

    #[test]
    fn test_access_ignored() {
        let access = translate(&event(EventKind::Access(AccessKind::Any), &["/repo/a.ts"]));
        assert!(access.is_empty());
    }

    #[test]
    fn test_directory_create_skipped() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("src");
        std::fs::create_dir(&dir).unwrap();

        let created = translate(&event(
            EventKind::Create(CreateKind::Folder),
            &[dir.to_str().unwrap()],
        ));
        assert!(created.is_empty());
    }

    #[test]
    fn test_watch_missing_root_fails() {
        let result = FsWatcher::watch(Path::new("/definitely/not/a/dir"), |_| {});
        assert!(matches!(result, Err(WatchError::Watch { .. })));
    }
}
