//! Bounded remediation loop.
//!
//! The retry controller is a finite state machine held as data: a session
//! struct plus a pure transition function. The async driver produces
//! events by calling the collaborators behind their seams (oracle trait,
//! patch applicator, pure extractor), so every transition is unit
//! testable without spawning a process. All failures inside the loop are
//! absorbed locally and each consumes one attempt; only reaching
//! [`RetryState::Exhausted`] surfaces as a failed session.

use std::path::Path;
use tracing::{debug, info, warn};

use crate::oracle::{FixRequest, OracleReply, PatchOracle};
use crate::patch::{extract_unified_diff, ApplyPatch};

/// States of the remediation loop.
///
/// `Succeeded` and `Exhausted` are the only terminal states; there is no
/// ambiguous outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    CapturingLog,
    RequestingPatch,
    ExtractingDiff,
    ApplyingPatch,
    Succeeded,
    Exhausted,
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded | RetryState::Exhausted)
    }
}

/// Observations that drive the machine forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    CaptureStarted,
    /// Log captured, or an existing log reused.
    LogReady,
    /// A reply arrived; a transport failure counts with empty text.
    ReplyReceived,
    DiffFound,
    DiffMissing,
    TreeChanged,
    TreeUnchanged,
}

/// One bounded remediation session.
///
/// `attempts_used` is monotonic and never exceeds `max_attempts`; one
/// attempt is consumed per oracle reply, whatever becomes of it.
#[derive(Debug)]
pub struct RetrySession {
    state: RetryState,
    attempts_used: u32,
    max_attempts: u32,
}

impl RetrySession {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: RetryState::Idle,
            attempts_used: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Advances the machine by one event and returns the new state.
    ///
    /// Events that make no sense in the current state leave it unchanged;
    /// terminal states absorb everything.
    pub fn advance(&mut self, event: RetryEvent) -> RetryState {
        use RetryEvent::*;
        use RetryState::*;

        let next = match (self.state, event) {
            (Idle, CaptureStarted) => CapturingLog,
            (CapturingLog, LogReady) => RequestingPatch,
            (RequestingPatch, ReplyReceived) => {
                self.attempts_used += 1;
                ExtractingDiff
            }
            (ExtractingDiff, DiffFound) => ApplyingPatch,
            (ExtractingDiff, DiffMissing) => self.retry_or_exhaust(),
            (ApplyingPatch, TreeChanged) => Succeeded,
            (ApplyingPatch, TreeUnchanged) => self.retry_or_exhaust(),
            (state, event) => {
                debug!(?state, ?event, "event ignored in current state");
                state
            }
        };
        self.state = next;
        next
    }

    fn retry_or_exhaust(&self) -> RetryState {
        if self.attempts_used < self.max_attempts {
            RetryState::RequestingPatch
        } else {
            RetryState::Exhausted
        }
    }
}

/// Terminal summary of a driven session.
#[derive(Debug, Clone, Copy)]
pub struct RetryOutcome {
    pub state: RetryState,
    pub attempts_used: u32,
}

impl RetryOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RetryState::Succeeded
    }
}

/// Drives a session to a terminal state.
///
/// The diagnostic log behind `request` has already been captured (or
/// reused) by the caller; the request and its context are fixed for the
/// whole session, attempts are never re-diagnosed. Every oracle reply is
/// dumped raw to `oracle_dump` for debugging before extraction.
pub async fn run_fix_session(
    oracle: &dyn PatchOracle,
    applier: &mut dyn ApplyPatch,
    request: &FixRequest,
    max_attempts: u32,
    oracle_dump: Option<&Path>,
) -> RetryOutcome {
    let mut session = RetrySession::new(max_attempts);
    session.advance(RetryEvent::CaptureStarted);
    session.advance(RetryEvent::LogReady);

    let mut reply = OracleReply::empty();
    let mut diff: Option<String> = None;

    while !session.state().is_terminal() {
        match session.state() {
            RetryState::RequestingPatch => {
                info!(
                    attempt = session.attempts_used() + 1,
                    max = session.max_attempts(),
                    oracle = oracle.name(),
                    "requesting patch"
                );
                reply = match oracle.propose_fix(request).await {
                    Ok(reply) => reply,
                    Err(err) => {
                        warn!(error = %err, "oracle request failed, treating as empty reply");
                        OracleReply::empty()
                    }
                };
                if let Some(path) = oracle_dump {
                    if let Err(err) = std::fs::write(path, &reply.text) {
                        warn!(path = %path.display(), error = %err, "could not dump oracle reply");
                    }
                }
                session.advance(RetryEvent::ReplyReceived);
            }
            RetryState::ExtractingDiff => {
                diff = reply
                    .diff
                    .clone()
                    .or_else(|| extract_unified_diff(&reply.text));
                let event = if diff.is_some() {
                    RetryEvent::DiffFound
                } else {
                    debug!("no recognizable unified diff in reply");
                    RetryEvent::DiffMissing
                };
                session.advance(event);
            }
            RetryState::ApplyingPatch => {
                let text = diff.as_deref().unwrap_or_default();
                let changed = match applier.apply(text) {
                    Ok(changed) => changed,
                    Err(err) => {
                        warn!(error = %err, "patch application failed");
                        false
                    }
                };
                let event = if changed {
                    RetryEvent::TreeChanged
                } else {
                    RetryEvent::TreeUnchanged
                };
                session.advance(event);
            }
            // Idle/CapturingLog were consumed above; terminal states end the loop.
            _ => break,
        }
    }

    let outcome = RetryOutcome {
        state: session.state(),
        attempts_used: session.attempts_used(),
    };
    info!(state = ?outcome.state, attempts = outcome.attempts_used, "session finished");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;
    use anyhow::Result;
    use std::collections::VecDeque;

    /// Applier that replays scripted verdicts without touching any tree.
    struct ScriptedApplier {
        verdicts: VecDeque<bool>,
        applied: Vec<String>,
    }

    impl ScriptedApplier {
        fn new(verdicts: impl IntoIterator<Item = bool>) -> Self {
            Self {
                verdicts: verdicts.into_iter().collect(),
                applied: Vec::new(),
            }
        }
    }

    impl ApplyPatch for ScriptedApplier {
        fn apply(&mut self, diff: &str) -> Result<bool> {
            self.applied.push(diff.to_string());
            Ok(self.verdicts.pop_front().unwrap_or(false))
        }
    }

    fn request() -> FixRequest {
        FixRequest {
            task: "fix".to_string(),
            sections: Vec::new(),
            want_diff: true,
            system: None,
        }
    }

    const DIFF: &str = "--- a/f\n+++ b/f\n@@ -1 +1 @@\n-a\n+b\n";

    #[test]
    fn session_walks_the_happy_path() {
        let mut s = RetrySession::new(3);
        assert_eq!(s.state(), RetryState::Idle);
        assert_eq!(s.advance(RetryEvent::CaptureStarted), RetryState::CapturingLog);
        assert_eq!(s.advance(RetryEvent::LogReady), RetryState::RequestingPatch);
        assert_eq!(s.advance(RetryEvent::ReplyReceived), RetryState::ExtractingDiff);
        assert_eq!(s.advance(RetryEvent::DiffFound), RetryState::ApplyingPatch);
        assert_eq!(s.advance(RetryEvent::TreeChanged), RetryState::Succeeded);
        assert_eq!(s.attempts_used(), 1);
    }

    #[test]
    fn attempts_never_exceed_max() {
        let mut s = RetrySession::new(2);
        s.advance(RetryEvent::CaptureStarted);
        s.advance(RetryEvent::LogReady);
        for _ in 0..5 {
            s.advance(RetryEvent::ReplyReceived);
            s.advance(RetryEvent::DiffMissing);
        }
        assert_eq!(s.state(), RetryState::Exhausted);
        assert_eq!(s.attempts_used(), 2);
    }

    #[test]
    fn terminal_states_absorb_events() {
        let mut s = RetrySession::new(1);
        s.advance(RetryEvent::CaptureStarted);
        s.advance(RetryEvent::LogReady);
        s.advance(RetryEvent::ReplyReceived);
        s.advance(RetryEvent::DiffMissing);
        assert_eq!(s.state(), RetryState::Exhausted);
        assert_eq!(s.advance(RetryEvent::ReplyReceived), RetryState::Exhausted);
        assert_eq!(s.advance(RetryEvent::TreeChanged), RetryState::Exhausted);
    }

    #[test]
    fn zero_max_attempts_is_clamped_to_one() {
        let s = RetrySession::new(0);
        assert_eq!(s.max_attempts(), 1);
    }

    #[tokio::test]
    async fn useless_oracle_exhausts_after_exactly_three_attempts() {
        let oracle = MockOracle::new();
        oracle.push_text("no diff here");
        oracle.push_failure("connection refused");
        oracle.push_text("still nothing");

        let mut applier = ScriptedApplier::new([]);
        let outcome = run_fix_session(&oracle, &mut applier, &request(), 3, None).await;

        assert_eq!(outcome.state, RetryState::Exhausted);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(oracle.requests_served(), 3);
        assert!(applier.applied.is_empty());
    }

    #[tokio::test]
    async fn success_on_second_attempt() {
        let oracle = MockOracle::new();
        oracle.push_text("cannot help");
        oracle.push_diff("here you go", DIFF);

        let mut applier = ScriptedApplier::new([true]);
        let outcome = run_fix_session(&oracle, &mut applier, &request(), 3, None).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(applier.applied, vec![DIFF.to_string()]);
    }

    #[tokio::test]
    async fn no_op_apply_consumes_attempts_until_exhausted() {
        let oracle = MockOracle::new();
        for _ in 0..3 {
            oracle.push_diff("try this", DIFF);
        }
        let mut applier = ScriptedApplier::new([false, false, false]);
        let outcome = run_fix_session(&oracle, &mut applier, &request(), 3, None).await;

        assert_eq!(outcome.state, RetryState::Exhausted);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(applier.applied.len(), 3);
    }

    #[tokio::test]
    async fn diff_is_extracted_from_raw_text_when_not_pre_parsed() {
        let oracle = MockOracle::new();
        oracle.push_text(format!("Here is the fix:\n{DIFF}"));

        let mut applier = ScriptedApplier::new([true]);
        let outcome = run_fix_session(&oracle, &mut applier, &request(), 3, None).await;

        assert!(outcome.is_success());
        assert_eq!(applier.applied.len(), 1);
        assert!(applier.applied[0].starts_with("--- a/f"));
    }

    #[tokio::test]
    async fn raw_reply_is_dumped_per_attempt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dump = tmp.path().join("oracle_response.txt");
        let oracle = MockOracle::new();
        oracle.push_text("first reply, no diff");
        oracle.push_diff("second reply", DIFF);

        let mut applier = ScriptedApplier::new([true]);
        let outcome =
            run_fix_session(&oracle, &mut applier, &request(), 3, Some(&dump)).await;

        assert!(outcome.is_success());
        // Overwritten per attempt: the dump holds the final reply.
        assert_eq!(std::fs::read_to_string(&dump).unwrap(), "second reply");
    }
}
