//! Baseline commit search
//!
//! The baseline is the merge-base of HEAD with the most plausible mainline
//! branch. Each candidate ref is resolved and its merge-base with HEAD
//! computed; the merge-base closest to HEAD wins and candidates tied on
//! distance keep their list order.

use crate::git::{GitService, Result};
use std::fmt;
use std::path::Path;
use tracing::trace;

/// Reference point for "changed since when"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    /// Candidate ref that produced this baseline (e.g. `main`)
    pub reference: String,
    /// Merge-base commit id
    pub commit: String,
    /// Commits between the merge-base and HEAD
    pub distance: u64,
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.commit.get(..12).unwrap_or(&self.commit);
        write!(f, "{} @ {} (HEAD +{})", self.reference, short, self.distance)
    }
}

/// Search `candidates` in priority order for the best baseline
///
/// Returns `Ok(None)` when HEAD is unborn or no candidate shares history
/// with it. Backend failures propagate so the caller decides how to log.
pub async fn find_baseline<S: AsRef<str>>(
    git: &dyn GitService,
    root: &Path,
    candidates: &[S],
) -> Result<Option<Baseline>> {
    let Some(head) = git.head(root).await? else {
        trace!(root = %root.display(), "HEAD is unborn, no baseline");
        return Ok(None);
    };

    let mut best: Option<Baseline> = None;

    for reference in candidates {
        let reference = reference.as_ref();

        let Some(tip) = git.resolve(root, reference).await? else {
            trace!(reference, "Candidate ref does not exist");
            continue;
        };

        let Some(commit) = git.merge_base(root, &head, &tip).await? else {
            trace!(reference, "Candidate shares no history with HEAD");
            continue;
        };

        let distance = git.distance(root, &commit, &head).await?;
        trace!(reference, commit = %commit, distance, "Candidate merge-base");

        // Strictly closer only: ties keep the earlier candidate
        if best.as_ref().map_or(true, |b| distance < b.distance) {
            best = Some(Baseline {
                reference: reference.to_string(),
                commit,
                distance,
            });
        }
    }

    Ok(best)
}
