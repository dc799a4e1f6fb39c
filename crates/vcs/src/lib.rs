//! Version-control side of changetrack
//!
//! This crate provides:
//! - [`GitService`], the async facade over the version-control backend
//! - [`GitCli`], its `git` command line implementation
//! - Baseline search over mainline candidates
//! - [`ChangeDetector`], which turns a baseline diff into a filtered file set

pub mod baseline;
pub mod detector;
pub mod git;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use baseline::{find_baseline, Baseline};
pub use detector::ChangeDetector;
pub use git::{GitCli, GitError, GitService};
