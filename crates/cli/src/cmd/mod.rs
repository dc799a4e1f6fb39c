//! CLI command implementations

pub mod baseline;
pub mod changed;
pub mod config;
pub mod watch;

use ct_core::{ExtensionChecker, TrackerConfig};
use std::sync::Arc;
use vcs::{ChangeDetector, GitCli};

/// Detector over the `git` executable with the configured extensions
fn detector(config: &TrackerConfig) -> ChangeDetector {
    ChangeDetector::new(
        Arc::new(GitCli::new()),
        Arc::new(ExtensionChecker::new(&config.files.extensions)),
        config,
    )
}
