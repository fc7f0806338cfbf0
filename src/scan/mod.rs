//! Repository scanner.
//!
//! Walks the target tree once, pruning version-control metadata, and
//! produces an ordered inventory of directories and files with bounded
//! text previews. The scan is best-effort throughout: unreadable entries
//! are skipped or recorded with an empty preview, never turned into a
//! failed scan.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::artifacts;
use crate::classify::BuildType;

/// Extensions whose contents are worth previewing.
const PREVIEW_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".gradle", ".kts", ".xml", ".json", ".py", ".java", ".c", ".cpp", ".h", ".hpp",
    ".cmake", ".toml", ".yml", ".yaml",
];

/// Files above this size never get a preview.
const MAX_PREVIEW_SOURCE_BYTES: u64 = 200 * 1024;

/// Upper bound on preview length.
const MAX_PREVIEW_BYTES: usize = 4096;

/// A single file in the inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// File name as found on disk.
    pub name: String,
    /// Lowercase extension including the dot, or empty.
    pub ext: String,
    /// Size in bytes; -1 when stat failed.
    pub size: i64,
    /// Bounded text preview; empty for binary, oversized, or unreadable files.
    pub preview: String,
}

/// A directory and its immediate files, in traversal order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirEntry {
    /// Path relative to the scan root, "." for the root itself.
    pub dir: String,
    pub files: Vec<FileEntry>,
}

/// Walks `root` and returns the ordered inventory.
///
/// The `.git` directory is pruned at any depth. Traversal is sorted by
/// file name so repeated scans of an unchanged tree yield an identical
/// inventory.
pub fn scan_tree(root: &Path) -> Vec<DirEntry> {
    info!(root = %root.display(), "scanning repository tree");
    let mut entries: Vec<DirEntry> = Vec::new();
    let mut index_of: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();

        if entry.file_type().is_dir() {
            let dir = if rel.is_empty() { ".".to_string() } else { rel };
            index_of.insert(dir.clone(), entries.len());
            entries.push(DirEntry {
                dir,
                files: Vec::new(),
            });
        } else if entry.file_type().is_file() {
            let parent = Path::new(&rel)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string());
            let file = inspect_file(entry.path());
            match index_of.get(&parent).copied() {
                Some(i) => entries[i].files.push(file),
                None => {
                    // Parent was not seen as a directory entry; record it anyway.
                    index_of.insert(parent.clone(), entries.len());
                    entries.push(DirEntry {
                        dir: parent,
                        files: vec![file],
                    });
                }
            }
        }
    }

    let file_count: usize = entries.iter().map(|e| e.files.len()).sum();
    info!(dirs = entries.len(), files = file_count, "scan complete");
    entries
}

fn inspect_file(path: &Path) -> FileEntry {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len() as i64,
        Err(_) => -1,
    };

    let preview = if size >= 0
        && size as u64 <= MAX_PREVIEW_SOURCE_BYTES
        && PREVIEW_EXTENSIONS.contains(&ext.as_str())
    {
        read_preview(path)
    } else {
        String::new()
    };

    FileEntry {
        name,
        ext,
        size,
        preview,
    }
}

/// Reads at most [`MAX_PREVIEW_BYTES`] and decodes permissively.
///
/// Strict UTF-8 first; on failure each byte maps to one char so the scan
/// never aborts on odd encodings. Unreadable files yield an empty preview.
fn read_preview(path: &Path) -> String {
    let mut buf = vec![0u8; MAX_PREVIEW_BYTES];
    let n = match fs::File::open(path).and_then(|mut f| f.read(&mut buf)) {
        Ok(n) => n,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "preview read failed");
            return String::new();
        }
    };
    buf.truncate(n);
    match String::from_utf8(buf) {
        Ok(text) => text,
        Err(err) => err
            .as_bytes()
            .iter()
            .map(|&b| b as char)
            .collect(),
    }
}

/// Structured probe report: timestamp plus the full inventory.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProbeReport {
    pub timestamp: String,
    pub types: Vec<String>,
    pub structure: Vec<DirEntry>,
}

/// Writes `probe_report.json` and `probe_report.log` under the state dir.
pub fn write_probe_report(
    root: &Path,
    types: &[BuildType],
    structure: &[DirEntry],
) -> anyhow::Result<()> {
    let dir = artifacts::ensure_state_dir(root)?;
    let report = ProbeReport {
        timestamp: Utc::now().to_rfc3339(),
        types: types.iter().map(|t| t.as_str().to_string()).collect(),
        structure: structure.to_vec(),
    };

    fs::write(
        dir.join(artifacts::PROBE_REPORT_JSON),
        serde_json::to_string_pretty(&report)?,
    )?;

    let mut log = String::new();
    log.push_str(&format!("[{}] buildmend probe report\n", report.timestamp));
    log.push_str(&format!("Detected types: {}\n\n", report.types.join(", ")));
    log.push_str("Directory structure:\n");
    for entry in structure {
        log.push_str(&format!("- {}/\n", entry.dir));
        for file in &entry.files {
            log.push_str(&format!(
                "   {} (ext={}, size={})\n",
                file.name, file.ext, file.size
            ));
        }
    }
    log.push_str("\n--- End of probe ---\n");
    fs::write(dir.join(artifacts::PROBE_REPORT_LOG), log)?;
    Ok(())
}
