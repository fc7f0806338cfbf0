//! Blocking child-process and git plumbing.
//!
//! Every external invocation in this crate is a synchronous
//! `std::process::Command` call with merged output; there is no internal
//! timeout layer. Callers that tolerate failure inspect
//! [`ShellOutput::status`] instead of propagating errors.

use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Captured result of a shell invocation.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    /// Combined stdout + stderr text, lossily decoded.
    pub output: String,
    /// Process exit code, if the process terminated normally.
    pub status: Option<i32>,
}

impl ShellOutput {
    /// True when the command exited with status zero.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs `cmd` through `sh -c` in `cwd`, capturing merged output.
///
/// A spawn failure yields an empty output with no status rather than an
/// error; the callers here all prefer partial results over aborting.
pub fn sh(cmd: &str, cwd: &Path) -> ShellOutput {
    debug!(cmd, cwd = %cwd.display(), "running shell command");
    match Command::new("sh")
        .arg("-c")
        .arg(format!("({cmd}) 2>&1"))
        .current_dir(cwd)
        .output()
    {
        Ok(out) => ShellOutput {
            output: String::from_utf8_lossy(&out.stdout).into_owned(),
            status: out.status.code(),
        },
        Err(err) => {
            warn!(cmd, error = %err, "failed to spawn shell command");
            ShellOutput {
                output: String::new(),
                status: None,
            }
        }
    }
}

/// Bootstraps a minimal git repository when `root` has none.
///
/// The applicator relies on the index for staging and change detection,
/// so a tree without `.git` gets an identity and an initial commit.
pub fn ensure_repo(root: &Path) {
    if root.join(".git").exists() {
        return;
    }
    debug!(root = %root.display(), "initializing git repository");
    sh("git init", root);
    sh("git config user.name \"buildmend\"", root);
    sh("git config user.email \"buildmend@local\"", root);
    sh("git add -A", root);
    sh("git commit -m \"bootstrap repository for build repair\" || true", root);
}

/// Returns up to `max_files` tracked paths, one per line.
pub fn tracked_files(root: &Path, max_files: usize) -> String {
    let out = sh("git ls-files || true", root);
    let files: Vec<&str> = out
        .output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(max_files)
        .collect();
    if files.is_empty() {
        "(no tracked files)".to_string()
    } else {
        files.join("\n")
    }
}

/// Returns the tail of the last-five-commits diff, bounded to `max_chars`.
pub fn recent_diff(root: &Path, max_chars: usize) -> String {
    let out = sh("git diff --unified=2 -M -C HEAD~5..HEAD || true", root);
    let diff = out.output;
    if diff.trim().is_empty() {
        return "(no recent git diff)".to_string();
    }
    match diff.char_indices().nth_back(max_chars.saturating_sub(1)) {
        Some((idx, _)) => diff[idx..].to_string(),
        None => diff,
    }
}

/// Stages the whole working tree.
pub fn stage_all(root: &Path) {
    sh("git add -A || true", root);
}

/// Applies a patch file permissively; rejected hunks land in `.rej` files.
pub fn apply_patch_file(root: &Path, patch_path: &Path) -> ShellOutput {
    sh(
        &format!(
            "git apply --reject --whitespace=fix \"{}\" || true",
            patch_path.display()
        ),
        root,
    )
}

/// True when `git status --porcelain` reports any tracked or untracked change.
pub fn tree_changed(root: &Path) -> bool {
    !sh("git status --porcelain", root).output.trim().is_empty()
}

/// Paths with unstaged or untracked changes.
///
/// Porcelain lines whose second status column is set (`?M D…`); entries
/// that are only staged (`A `, `M `) are not included. With the whole
/// tree staged beforehand, this isolates exactly what an apply did.
pub fn unstaged_or_untracked(root: &Path) -> Vec<String> {
    sh("git status --porcelain", root)
        .output
        .lines()
        .filter_map(|line| {
            let mut chars = line.chars();
            let _staged = chars.next()?;
            let worktree = chars.next()?;
            if worktree == ' ' {
                return None;
            }
            Some(line.get(3..)?.trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sh_captures_merged_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = sh("echo out && echo err >&2", tmp.path());
        assert_eq!(out.status, Some(0));
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[test]
    fn sh_reports_nonzero_status() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = sh("exit 3", tmp.path());
        assert_eq!(out.status, Some(3));
    }

    #[test]
    fn recent_diff_placeholder_outside_history() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert_eq!(recent_diff(tmp.path(), 3000), "(no recent git diff)");
    }

    #[test]
    fn tracked_files_placeholder_outside_repo() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert_eq!(tracked_files(tmp.path(), 120), "(no tracked files)");
    }
}
