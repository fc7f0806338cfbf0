//! Diff extraction and patch application.

mod apply;
mod extract;

pub use apply::{ApplyPatch, PatchApplicator};
pub use extract::extract_unified_diff;
