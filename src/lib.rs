//! buildmend - build-system detection and AI-assisted build repair
//!
//! This library inspects an arbitrary source repository, infers which
//! build system it uses, synthesizes the most plausible build invocation,
//! runs it once, and on failure drives a bounded retry loop that asks an
//! external text-generation oracle for a minimal unified diff and applies
//! it to the working tree.
//!
//! # Core Concepts
//!
//! - **Classification**: a deterministic, priority-ordered, never-empty
//!   set of build-system categories derived from a one-pass scan
//! - **Synthesis**: the single most probable build invocation for a
//!   category, including the multi-wrapper Gradle ranking for Android
//! - **Remediation**: a finite state machine that captures the failing
//!   build once, then repeatedly requests, extracts, and applies patches
//!   within an attempt budget
//!
//! # Example Usage
//!
//! ```ignore
//! use buildmend::{classify, probe, scan};
//! use std::path::Path;
//!
//! let root = Path::new("/path/to/repo");
//! let inventory = scan::scan_tree(root);
//! let classification = classify::classify(root, &inventory);
//! let command = probe::synthesize(root, classification.primary(), &inventory);
//! println!("BUILD_CMD={command}");
//! ```
//!
//! # Project Structure
//!
//! - [`scan`]: one-pass repository inventory with bounded previews
//! - [`classify`]: build-type classification and detection artifacts
//! - [`probe`]: build-command synthesis per category
//! - [`diagnose`]: idempotent capture of the failing build output
//! - [`oracle`]: the external patch-oracle boundary and its backends
//! - [`patch`]: unified-diff extraction and permissive application
//! - [`retry`]: the bounded remediation state machine
//! - [`workflow`]: generated CI pipeline definition

pub mod artifacts;
pub mod classify;
pub mod cli;
pub mod config;
pub mod diagnose;
pub mod oracle;
pub mod patch;
pub mod probe;
pub mod repo;
pub mod retry;
pub mod scan;
pub mod util;
pub mod workflow;

// Re-export key types for convenient access
pub use classify::{BuildType, Classification, CmakeFlavor, CmakeFlavorKind};
pub use config::{BuildmendConfig, ConfigError};
pub use oracle::{FixRequest, GenAiOracle, MockOracle, OracleError, OracleReply, PatchOracle};
pub use patch::{extract_unified_diff, ApplyPatch, PatchApplicator};
pub use retry::{RetryEvent, RetryOutcome, RetrySession, RetryState};
pub use scan::{DirEntry, FileEntry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
