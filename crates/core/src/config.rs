//! Tracker configuration
//!
//! Loaded from TOML. Every field has a default so partial files work:
//!
//! ```toml
//! [tracker]
//! queue_interval_ms = 250
//! reconcile_interval_secs = 30
//!
//! [baseline]
//! candidates = ["main", "master"]
//!
//! [files]
//! extensions = ["rs", "ts"]
//!
//! [ignore]
//! use_gitignore = true
//! use_ctignore = true
//! additional_patterns = ["*.generated.ts"]
//! ```

use crate::collab::DEFAULT_EXTENSIONS;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Candidate baseline refs in priority order
pub const DEFAULT_BASELINE_CANDIDATES: &[&str] = &[
    "main",
    "master",
    "develop",
    "trunk",
    "origin/main",
    "origin/master",
    "origin/develop",
    "origin/trunk",
];

/// Full tracker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub tracker: TimingConfig,

    #[serde(default)]
    pub baseline: BaselineConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub ignore: IgnoreConfig,
}

impl TrackerConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(10..=60_000).contains(&self.tracker.queue_interval_ms) {
            return Err(Error::Config(format!(
                "tracker.queue_interval_ms must be between 10 and 60000 (got {})",
                self.tracker.queue_interval_ms
            )));
        }

        if !(1..=86_400).contains(&self.tracker.reconcile_interval_secs) {
            return Err(Error::Config(format!(
                "tracker.reconcile_interval_secs must be between 1 and 86400 (got {})",
                self.tracker.reconcile_interval_secs
            )));
        }

        if self.baseline.candidates.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::Config(
                "baseline.candidates must not contain empty names".to_string(),
            ));
        }

        if self.files.extensions.is_empty() {
            return Err(Error::Config(
                "files.extensions must list at least one extension".to_string(),
            ));
        }

        Ok(())
    }
}

/// Timing of the live queue and the periodic reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How often queued filesystem events are drained (default: 250ms)
    #[serde(default = "default_queue_interval_ms")]
    pub queue_interval_ms: u64,

    /// How often a full reconciliation runs (default: 30s)
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

impl TimingConfig {
    pub fn queue_interval(&self) -> Duration {
        Duration::from_millis(self.queue_interval_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            queue_interval_ms: default_queue_interval_ms(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

/// Baseline search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Candidate refs in priority order; earlier wins ties
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
        }
    }
}

/// Supported file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Extensions eligible for tracking (case-insensitive, no leading dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore and .git/info/exclude patterns (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Use .ctignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_ctignore: bool,

    /// Additional gitignore-style patterns from config
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_ctignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_queue_interval_ms() -> u64 {
    250
}

fn default_reconcile_interval_secs() -> u64 {
    30
}

fn default_candidates() -> Vec<String> {
    DEFAULT_BASELINE_CANDIDATES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

/// Example configuration file with comments
pub fn example_config() -> &'static str {
    r#"# changetrack configuration

[tracker]
# How often queued filesystem events are applied (10-60000 ms)
queue_interval_ms = 250
# How often the tracked set is rebuilt from git (1-86400 s)
reconcile_interval_secs = 30

[baseline]
# Candidate branches in priority order. The candidate whose merge-base is
# closest to HEAD wins; ties go to the earlier entry.
candidates = ["main", "master", "develop", "trunk", "origin/main", "origin/master", "origin/develop", "origin/trunk"]

[files]
extensions = ["rs", "ts", "tsx", "js", "jsx", "py", "go", "java"]

[ignore]
use_gitignore = true
use_ctignore = true
additional_patterns = []
"#
}
