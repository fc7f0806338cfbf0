//! Fixed locations for persisted artifacts.
//!
//! Everything the pipeline writes lands either in the `.buildmend/` state
//! directory inside the target repository or, for the build log and the
//! patch snapshot, at the repository root. All artifacts are overwritten
//! per invocation except the build log, which is append-once (see
//! [`crate::diagnose`]).

use std::io;
use std::path::{Path, PathBuf};

/// State directory created inside the target repository.
pub const STATE_DIR: &str = ".buildmend";

/// Build log captured from the failing build, at the repository root.
pub const BUILD_LOG: &str = "build.log";

/// Snapshot of the last diff handed to the applicator, at the repository root.
pub const PATCH_SNAPSHOT: &str = ".pre_fix.patch";

/// Machine-readable category list.
pub const DETECTED_JSON: &str = "detected.json";

/// Full evidence map, CMake flavors, and folder hints.
pub const SCAN_JSON: &str = "scan.json";

/// Human-readable scan log with per-bucket file hits.
pub const SCAN_LOG: &str = "scan.log";

/// Short per-bucket hit counts.
pub const SUMMARY_TXT: &str = "summary.txt";

/// Structured probe report (timestamp + directory/file inventory).
pub const PROBE_REPORT_JSON: &str = "probe_report.json";

/// Human-readable probe report.
pub const PROBE_REPORT_LOG: &str = "probe_report.log";

/// Raw oracle response dump, for debugging.
pub const ORACLE_RESPONSE: &str = "oracle_response.txt";

/// Returns the state directory path for a repository root.
pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

/// Creates the state directory if needed and returns its path.
pub fn ensure_state_dir(root: &Path) -> io::Result<PathBuf> {
    let dir = state_dir(root);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Artifact paths owned by one remediation session.
///
/// The session holds its own copies rather than sharing globals; two
/// sessions against one tree are unsupported and would race on these.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    /// Append-once diagnostic log.
    pub build_log: PathBuf,
    /// Verbatim snapshot of the candidate diff, written before any apply.
    pub patch_snapshot: PathBuf,
    /// Raw oracle reply text, overwritten per attempt.
    pub oracle_dump: PathBuf,
}

impl SessionPaths {
    /// Derives the fixed artifact locations for a repository root.
    pub fn for_repo(root: &Path) -> Self {
        Self {
            build_log: root.join(BUILD_LOG),
            patch_snapshot: root.join(PATCH_SNAPSHOT),
            oracle_dump: state_dir(root).join(ORACLE_RESPONSE),
        }
    }
}
