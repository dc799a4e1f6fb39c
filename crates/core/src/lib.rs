//! Core types for changetrack
//!
//! This crate provides:
//! - File change events produced by filesystem watchers
//! - Collaborator traits (supported files, saved files, open files)
//! - Ignore rule evaluation (.gitignore, .ctignore, built-ins)
//! - Tracker configuration (TOML)
//! - The shared error type

pub mod collab;
pub mod config;
pub mod error;
pub mod event;
pub mod ignore;

#[cfg(feature = "testing")]
pub mod testing;

// Re-exports
pub use collab::{
    ExtensionChecker, OpenFiles, OpenFilesObserver, SavedFiles, SavedFilesTracker,
    SupportedFileChecker,
};
pub use config::TrackerConfig;
pub use error::{Error, Result};
pub use event::{ChangeKind, FileChangeEvent};
pub use ignore::IgnoreRules;
