//! Subcommand handlers.
//!
//! Each handler resolves its inputs, runs the relevant slice of the
//! pipeline, and returns a process exit code. Only the fix loop can exit
//! nonzero for a domain reason (attempt budget exhausted); everything
//! else fails only on unusable input or I/O trouble.

use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::commands::{DetectArgs, FixArgs, ProbeArgs};
use crate::artifacts::{self, SessionPaths};
use crate::classify;
use crate::config::BuildmendConfig;
use crate::diagnose;
use crate::oracle::context::build_fix_request;
use crate::patch::PatchApplicator;
use crate::probe;
use crate::repo;
use crate::retry::run_fix_session;
use crate::scan;
use crate::workflow;

fn resolve_root(path: &Option<PathBuf>) -> Result<PathBuf, i32> {
    let root = path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    root.canonicalize().map_err(|err| {
        error!(path = %root.display(), error = %err, "repository path is not usable");
        2
    })
}

/// `buildmend detect`: scan, classify, persist artifacts, generate the
/// probe workflow.
pub fn handle_detect(args: &DetectArgs) -> i32 {
    let root = match resolve_root(&args.repository_path) {
        Ok(root) => root,
        Err(code) => return code,
    };

    let inventory = scan::scan_tree(&root);
    let classification = classify::classify(&root, &inventory);

    if let Err(err) = classify::write_artifacts(&root, &classification) {
        error!(error = %err, "failed to write detection artifacts");
        return 1;
    }
    match workflow::generate_probe_workflow(&root, &classification.types) {
        Ok(path) => info!(path = %path.display(), "probe workflow written"),
        Err(err) => {
            error!(error = %err, "failed to generate probe workflow");
            return 1;
        }
    }

    println!(
        "Detected types: {}",
        classification
            .types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    0
}

/// `buildmend probe`: synthesize the build command for a category and
/// print the single `BUILD_CMD=` contract line.
pub fn handle_probe(args: &ProbeArgs) -> i32 {
    let root = match resolve_root(&args.repository_path) {
        Ok(root) => root,
        Err(code) => return code,
    };

    let inventory = scan::scan_tree(&root);
    let classification = classify::classify(&root, &inventory);
    let command = probe::synthesize(&root, args.target, &inventory);

    if let Err(err) = scan::write_probe_report(&root, &classification.types, &inventory) {
        warn!(error = %err, "failed to write probe report");
    }

    // The contract: exactly one line on stdout. Logs go to stderr.
    println!("BUILD_CMD={}", command);
    0
}

/// `buildmend fix`: capture the failing build once, then drive the
/// bounded oracle/extract/apply loop.
pub async fn handle_fix(args: &FixArgs) -> i32 {
    let config = match BuildmendConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "configuration error");
            return 2;
        }
    };
    let root = match resolve_root(&args.repository_path) {
        Ok(root) => root,
        Err(code) => return code,
    };

    repo::ensure_repo(&root);
    if let Err(err) = artifacts::ensure_state_dir(&root) {
        error!(error = %err, "could not create state directory");
        return 1;
    }
    let paths = SessionPaths::for_repo(&root);

    let build_cmd = resolve_build_cmd(args, &root);
    info!(command = %build_cmd, "active build command");

    if let Err(err) = diagnose::capture_build_log(&root, &build_cmd, &paths.build_log) {
        // A failed capture still leaves the loop viable; the request will
        // carry a "(no build log)" placeholder.
        warn!(error = %err, "diagnostic capture failed");
    }

    let request = build_fix_request(&root, &build_cmd, &paths.build_log, config.log_tail_lines);
    let oracle = config.create_oracle();
    let mut applier = PatchApplicator::new(&root, &paths.patch_snapshot);
    let max_attempts = args.attempts.unwrap_or(config.max_attempts);

    let outcome = run_fix_session(
        oracle.as_ref(),
        &mut applier,
        &request,
        max_attempts,
        Some(&paths.oracle_dump),
    )
    .await;

    if outcome.is_success() {
        println!(
            "Patch applied and working tree changed (attempt {} of {}).",
            outcome.attempts_used, max_attempts
        );
        println!("Snapshot: {}", paths.patch_snapshot.display());
        0
    } else {
        eprintln!("No usable patch after {} attempts.", outcome.attempts_used);
        1
    }
}

/// Active build command: explicit flag, then `$BUILD_CMD`, then synthesis
/// from the highest-priority detected category.
fn resolve_build_cmd(args: &FixArgs, root: &Path) -> String {
    if let Some(cmd) = &args.build_cmd {
        return cmd.clone();
    }
    if let Ok(cmd) = env::var("BUILD_CMD") {
        if !cmd.trim().is_empty() {
            return cmd;
        }
    }
    let inventory = scan::scan_tree(root);
    let classification = classify::classify(root, &inventory);
    probe::synthesize(root, classification.primary(), &inventory)
}
