//! Diagnostic capture of the failing build.
//!
//! Runs the active build command once with merged output streams, teeing
//! every line to the console and to the persistent build log. The capture
//! is idempotent: a non-empty log from an earlier run is reused untouched,
//! so repeated invocations of the whole pipeline diagnose exactly once.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Captures the build output into `log_path`.
///
/// Returns `true` when the build actually ran, `false` when the capture
/// was skipped (existing non-empty log, or an empty command).
pub fn capture_build_log(root: &Path, build_cmd: &str, log_path: &Path) -> Result<bool> {
    if log_path
        .metadata()
        .map(|m| m.len() > 0)
        .unwrap_or(false)
    {
        info!(log = %log_path.display(), "build log already present, skipping capture");
        return Ok(false);
    }
    if build_cmd.trim().is_empty() {
        debug!("no build command, skipping capture");
        return Ok(false);
    }

    info!(command = build_cmd, "capturing build output");
    let mut log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open build log {:?}", log_path))?;

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(format!("({build_cmd}) 2>&1"))
        .current_dir(root)
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .spawn()
        .context("failed to spawn build command")?;

    let stdout = child.stdout.take().expect("stdout piped above");
    let mut reader = BufReader::new(stdout);
    let mut console = std::io::stdout();
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        console.write_all(&line)?;
        log_file.write_all(&line)?;
    }

    let status = child.wait().context("failed to wait for build command")?;
    info!(exit = ?status.code(), "build capture finished");
    Ok(true)
}

/// Returns the last `lines` lines of the build log.
pub fn log_tail(log_path: &Path, lines: usize) -> String {
    let Ok(file) = File::open(log_path) else {
        return "(no build log)".to_string();
    };
    let all: Vec<String> = BufReader::new(file)
        .lines()
        .map(|l| l.unwrap_or_default())
        .collect();
    if all.is_empty() {
        return "(empty build log)".to_string();
    }
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
