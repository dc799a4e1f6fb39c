//! Ignore pattern management
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (.git/, .jj/, editor save artifacts - always active)
//! 2. .gitignore and .git/info/exclude patterns (optional, enabled by default)
//! 3. .ctignore patterns (changetrack-specific, optional)
//! 4. Config-based patterns (additional custom patterns)
//!
//! Rules are read from disk when loaded. Callers that need to observe edits
//! to the ignore files either reload or build a fresh set.

use crate::config::IgnoreConfig;
use crate::error::Result;
use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Name of the changetrack-specific ignore file
pub const CTIGNORE_FILE: &str = ".ctignore";

/// Directories that are never tracked
const BUILTIN_DIRS: &[&str] = &[
    ".git", ".jj", ".hg", ".svn", ".vs", ".idea", ".vscode", "node_modules", "__pycache__",
    ".venv",
];

/// Ignore rule manager
///
/// Combines the sources with this precedence:
/// 1. Built-in patterns (always enforced)
/// 2. .ctignore patterns (may whitelist paths .gitignore ignores)
/// 3. .gitignore patterns
/// 4. Additional config patterns
#[derive(Debug)]
pub struct IgnoreRules {
    /// Repository root directory
    repo_root: PathBuf,

    /// .gitignore + .git/info/exclude
    gitignore: Option<Gitignore>,

    /// .ctignore
    ctignore: Option<Gitignore>,

    /// Config patterns compiled as one gitignore
    additional: Option<Gitignore>,

    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for repository
    pub fn load(repo_root: &Path, config: &IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            repo_root: repo_root.to_path_buf(),
            gitignore: None,
            ctignore: None,
            additional: None,
            config: config.clone(),
        };

        rules.reload()?;
        Ok(rules)
    }

    /// Rules with only the built-in patterns active
    pub fn builtin(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            gitignore: None,
            ctignore: None,
            additional: None,
            config: IgnoreConfig {
                use_gitignore: false,
                use_ctignore: false,
                additional_patterns: vec![],
            },
        }
    }

    /// Re-read ignore files from disk
    pub fn reload(&mut self) -> Result<()> {
        self.gitignore = if self.config.use_gitignore {
            let sources = [
                self.repo_root.join(".gitignore"),
                self.repo_root.join(".git").join("info").join("exclude"),
            ];
            self.build_from_files(&sources)?
        } else {
            None
        };

        self.ctignore = if self.config.use_ctignore {
            self.build_from_files(&[self.repo_root.join(CTIGNORE_FILE)])?
        } else {
            None
        };

        self.additional = if self.config.additional_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(&self.repo_root);
            for pattern in &self.config.additional_patterns {
                if let Err(e) = builder.add_line(None, pattern) {
                    warn!(pattern = %pattern, error = %e, "Skipping invalid ignore pattern");
                }
            }
            Some(builder.build()?)
        };

        debug!(
            root = %self.repo_root.display(),
            sources = self.active_sources(),
            "Ignore rules loaded"
        );

        Ok(())
    }

    fn build_from_files(&self, files: &[PathBuf]) -> Result<Option<Gitignore>> {
        let existing: Vec<&PathBuf> = files.iter().filter(|p| p.is_file()).collect();
        if existing.is_empty() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.repo_root);
        for file in existing {
            if let Some(err) = builder.add(file) {
                warn!(file = %file.display(), error = %err, "Error parsing ignore file, continuing with partial rules");
            }
        }

        Ok(Some(builder.build()?))
    }

    /// Check if path should be ignored
    ///
    /// Accepts paths relative to the repository root or absolute paths. An
    /// absolute path outside the repository is always ignored.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.repo_root) {
                Ok(rel) => rel,
                Err(_) => return true,
            }
        } else {
            path
        };

        if relative.as_os_str().is_empty() {
            return false;
        }

        // 1. Built-in patterns
        if is_builtin_ignored(relative) {
            return true;
        }

        let is_dir = self.repo_root.join(relative).is_dir();

        // 2. .ctignore (may whitelist)
        if let Some(ref ctignore) = self.ctignore {
            let matched = ctignore.matched_path_or_any_parents(relative, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }

        // 3. .gitignore
        if let Some(ref gitignore) = self.gitignore {
            if gitignore
                .matched_path_or_any_parents(relative, is_dir)
                .is_ignore()
            {
                return true;
            }
        }

        // 4. Additional config patterns
        if let Some(ref additional) = self.additional {
            if additional
                .matched_path_or_any_parents(relative, is_dir)
                .is_ignore()
            {
                return true;
            }
        }

        false
    }

    /// Whether `path` is one of the files these rules are built from
    pub fn is_rule_file(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.repo_root).unwrap_or(path);
        relative == Path::new(".gitignore")
            || relative == Path::new(CTIGNORE_FILE)
            || relative == Path::new(".git/info/exclude")
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        1 + usize::from(self.gitignore.is_some())
            + usize::from(self.ctignore.is_some())
            + usize::from(self.additional.is_some())
    }

    /// Get repository root
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}

/// Built-in patterns, enforced regardless of configuration
fn is_builtin_ignored(relative: &Path) -> bool {
    let in_builtin_dir = relative.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| BUILTIN_DIRS.contains(&name)),
        _ => false,
    });
    if in_builtin_dir {
        return true;
    }

    relative
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(is_editor_artifact)
}

/// Editor swap/backup/lock files and OS junk
///
/// Covers: Vim, Emacs, JetBrains safe-write, MacOS/Windows system files
fn is_editor_artifact(filename: &str) -> bool {
    // Vim swap files
    if [".swp", ".swo", ".swn", ".swx"]
        .iter()
        .any(|ext| filename.ends_with(ext))
    {
        return true;
    }

    // Vim/Emacs backup files
    if filename.ends_with('~') {
        return true;
    }

    // Emacs auto-save (#file#) and lock (.#file) files
    if (filename.starts_with('#') && filename.ends_with('#')) || filename.starts_with(".#") {
        return true;
    }

    // JetBrains and VS safe-write temporaries
    if filename.ends_with("___jb_tmp___") || filename.ends_with("___jb_old___") {
        return true;
    }
    if filename.ends_with(".tmp") || filename.ends_with(".TMP") {
        return true;
    }

    // MacOS / Windows system files
    filename == ".DS_Store"
        || filename.starts_with("._")
        || filename == "Thumbs.db"
        || filename == "desktop.ini"
}
