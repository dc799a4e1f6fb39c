//! File system watching for changetrack
//!
//! This crate provides:
//! - A batching event queue that decouples watcher threads from async handlers
//! - A fixed-interval executor that drops ticks while a run is in flight
//! - A `notify` adapter producing [`FileChangeEvent`]s

pub mod fs;
pub mod queue;
pub mod scheduler;

pub use ct_core::{ChangeKind, FileChangeEvent};
pub use fs::{FsWatcher, WatchError};
pub use queue::{EventHandler, EventQueueProcessor};
pub use scheduler::{Action, DroppingExecutor, DroppingExecutorBuilder};
