//! Patch oracle boundary.
//!
//! The external text-generation capability sits behind the
//! [`PatchOracle`] trait: one implementation per backend, selected by
//! configuration at startup. Callers treat every transport failure as an
//! empty reply; nothing behind this boundary may end the process.

pub mod context;
mod genai;
mod mock;

pub use genai::GenAiOracle;
pub use mock::MockOracle;

use async_trait::async_trait;
use thiserror::Error;

/// Errors crossing the oracle boundary.
///
/// These are absorbed by the retry controller, never propagated; each one
/// still consumes a retry attempt.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("oracle transport failed: {message}")]
    Transport { message: String },

    #[error("oracle request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("oracle configuration error: {message}")]
    Configuration { message: String },
}

/// One titled context section of a fix request.
#[derive(Debug, Clone)]
pub struct ContextSection {
    pub title: String,
    pub body: String,
}

impl ContextSection {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A bounded request for a minimal fix.
#[derive(Debug, Clone)]
pub struct FixRequest {
    /// Fixed task instruction.
    pub task: String,
    /// Ordered context sections: file list, recent diff, command, log tail.
    pub sections: Vec<ContextSection>,
    /// Whether the reply should carry a unified diff.
    pub want_diff: bool,
    /// Optional system preamble.
    pub system: Option<String>,
}

impl FixRequest {
    /// Renders the task plus context sections into one prompt document.
    pub fn prompt(&self) -> String {
        let mut out = String::from(&self.task);
        for section in &self.sections {
            out.push_str("\n\n## ");
            out.push_str(&section.title);
            out.push('\n');
            out.push_str(&section.body);
        }
        out
    }
}

/// The oracle's reply: free text plus an optional pre-extracted diff.
#[derive(Debug, Clone, Default)]
pub struct OracleReply {
    pub text: String,
    pub diff: Option<String>,
}

impl OracleReply {
    /// The empty reply callers substitute for a transport failure.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// External capability that proposes candidate fixes.
#[async_trait]
pub trait PatchOracle: Send + Sync {
    /// Issues one fix request.
    async fn propose_fix(&self, request: &FixRequest) -> Result<OracleReply, OracleError>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_renders_sections_in_order() {
        let request = FixRequest {
            task: "fix it".to_string(),
            sections: vec![
                ContextSection::new("Build command", "make -j"),
                ContextSection::new("Build log tail", "error: boom"),
            ],
            want_diff: true,
            system: None,
        };
        let prompt = request.prompt();
        assert!(prompt.starts_with("fix it"));
        let cmd_pos = prompt.find("## Build command").unwrap();
        let log_pos = prompt.find("## Build log tail").unwrap();
        assert!(cmd_pos < log_pos);
    }

    #[test]
    fn oracle_error_display() {
        let err = OracleError::Transport {
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }
}
