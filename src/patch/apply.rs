//! Permissive patch application.
//!
//! The candidate diff is snapshotted verbatim before anything touches the
//! tree, so even a failed attempt stays auditable. Application is
//! whitespace-tolerant and hunk-by-hunk: unappliable hunks become reject
//! fragments instead of aborting. Success is judged by what actually
//! happened to the working tree, never by the apply command's exit code.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::repo;

/// Seam for applying a candidate diff to a working tree.
///
/// The retry controller depends on this trait rather than on git, so the
/// loop is testable without a real repository.
pub trait ApplyPatch {
    /// Applies `diff`; `Ok(true)` only when the tree observably changed.
    fn apply(&mut self, diff: &str) -> Result<bool>;
}

/// Applies diffs to one working tree through git.
///
/// All working-tree mutation in the crate funnels through this type; the
/// single-writer assumption of the remediation session hangs on that.
/// Staging everything before the apply means the post-apply status shows
/// only what the patch itself did; reject fragments and the session's own
/// artifacts are discounted, so an apply that produced nothing but
/// rejects reports failure even when git exited cleanly.
#[derive(Debug)]
pub struct PatchApplicator {
    root: PathBuf,
    snapshot: PathBuf,
}

impl PatchApplicator {
    pub fn new(root: impl Into<PathBuf>, snapshot: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot: snapshot.into(),
        }
    }

    /// Path the last candidate diff was snapshotted to.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot
    }

    fn is_session_artifact(&self, path: &str) -> bool {
        path.ends_with(".rej")
            || Path::new(path) == self.snapshot.strip_prefix(&self.root).unwrap_or(&self.snapshot)
            || path.starts_with(crate::artifacts::STATE_DIR)
            || path == crate::artifacts::BUILD_LOG
    }
}

impl ApplyPatch for PatchApplicator {
    fn apply(&mut self, diff: &str) -> Result<bool> {
        // Snapshot first: the artifact must exist even if the apply fails.
        std::fs::write(&self.snapshot, diff)
            .with_context(|| format!("failed to write patch snapshot {:?}", self.snapshot))?;
        debug!(snapshot = %self.snapshot.display(), bytes = diff.len(), "patch snapshot written");

        repo::stage_all(&self.root);
        let out = repo::apply_patch_file(&self.root, &self.snapshot);
        if !out.output.trim().is_empty() {
            debug!(output = %out.output.trim(), "git apply output");
        }

        let changes: Vec<String> = repo::unstaged_or_untracked(&self.root)
            .into_iter()
            .filter(|p| !self.is_session_artifact(p))
            .collect();

        if changes.is_empty() {
            warn!("apply produced no working-tree changes");
            Ok(false)
        } else {
            info!(files = changes.len(), "patch applied, working tree changed");
            Ok(true)
        }
    }
}
