//! Fix-request assembly.
//!
//! Gathers the bounded context bundle sent with every oracle request: a
//! truncated tracked-file listing, the tail of recent history, the
//! literal build command, and the tail of the diagnostic log. Captured
//! once per session and reused across attempts.

use std::path::Path;

use crate::diagnose;
use crate::oracle::{ContextSection, FixRequest};
use crate::repo;

/// Fixed instruction sent with every fix request.
pub const FIX_TASK: &str = "You are an automated build fixer working in a Git repository.\n\
     Goal: return ONLY a unified diff (---/+++ with @@ hunks) that minimally fixes the build error.\n\
     Keep edits small and safe; update build config (Gradle/CMake/etc.) only if needed. \
     Do not change unrelated files.";

/// System preamble for backends that support one.
pub const FIX_SYSTEM: &str =
    "You are a precise CI fixer. Output only a unified diff when asked for code changes.";

/// Upper bound on the tracked-file listing.
const MAX_LISTED_FILES: usize = 120;

/// Upper bound on the recent-history diff, in characters.
const MAX_DIFF_CHARS: usize = 3000;

/// Builds the fix request for one remediation session.
pub fn build_fix_request(
    root: &Path,
    build_cmd: &str,
    log_path: &Path,
    log_tail_lines: usize,
) -> FixRequest {
    let tree = repo::tracked_files(root, MAX_LISTED_FILES);
    let diff = repo::recent_diff(root, MAX_DIFF_CHARS);
    let tail = diagnose::log_tail(log_path, log_tail_lines);
    let command = if build_cmd.trim().is_empty() {
        "(unknown)".to_string()
    } else {
        build_cmd.to_string()
    };

    FixRequest {
        task: FIX_TASK.to_string(),
        sections: vec![
            ContextSection::new("Repository file list (truncated)", tree),
            ContextSection::new("Recent git diff (truncated)", diff),
            ContextSection::new("Build command", command),
            ContextSection::new(
                format!("Build log tail (last {log_tail_lines} lines)"),
                tail,
            ),
        ],
        want_diff: true,
        system: Some(FIX_SYSTEM.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn request_carries_all_four_sections() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("build.log");
        fs::write(&log, "error: undefined reference\n").unwrap();

        let request = build_fix_request(tmp.path(), "make -j", &log, 50);
        assert_eq!(request.sections.len(), 4);
        assert!(request.want_diff);
        let prompt = request.prompt();
        assert!(prompt.contains("make -j"));
        assert!(prompt.contains("undefined reference"));
        assert!(prompt.contains("Repository file list"));
    }

    #[test]
    fn empty_command_becomes_placeholder() {
        let tmp = TempDir::new().unwrap();
        let request = build_fix_request(tmp.path(), "", &tmp.path().join("none.log"), 10);
        assert!(request.prompt().contains("(unknown)"));
        assert!(request.prompt().contains("(no build log)"));
    }
}
