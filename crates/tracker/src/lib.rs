//! Tracked file set coordination for changetrack
//!
//! [`ChangeTracker`] merges live filesystem events with periodic
//! reconciliation against the version-control baseline, plus the host's
//! saved and open files, into one continuously updated set.

pub mod coordinator;
pub mod set;

pub use coordinator::{ChangeCallback, ChangeTracker, ChangeTrackerBuilder};
pub use set::TrackedFiles;
