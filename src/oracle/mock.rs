//! Scripted oracle for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{FixRequest, OracleError, OracleReply, PatchOracle};

/// Oracle that replays queued replies in order.
///
/// An exhausted queue behaves like a transport failure, which callers
/// already downgrade to an empty reply.
pub struct MockOracle {
    replies: Mutex<VecDeque<Result<OracleReply, OracleError>>>,
    requests_seen: Mutex<Vec<FixRequest>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests_seen: Mutex::new(Vec::new()),
        }
    }

    /// Queues a plain-text reply with no recognizable diff.
    pub fn push_text(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(OracleReply {
            text: text.into(),
            diff: None,
        }));
    }

    /// Queues a reply carrying a pre-extracted diff.
    pub fn push_diff(&self, text: impl Into<String>, diff: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(OracleReply {
            text: text.into(),
            diff: Some(diff.into()),
        }));
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(OracleError::Transport {
                message: message.into(),
            }));
    }

    /// Number of requests the oracle has served.
    pub fn requests_served(&self) -> usize {
        self.requests_seen.lock().unwrap().len()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatchOracle for MockOracle {
    async fn propose_fix(&self, request: &FixRequest) -> Result<OracleReply, OracleError> {
        self.requests_seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(OracleError::Transport {
                    message: "mock oracle has no scripted reply".to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FixRequest {
        FixRequest {
            task: "fix".to_string(),
            sections: Vec::new(),
            want_diff: true,
            system: None,
        }
    }

    #[tokio::test]
    async fn replies_come_back_in_order() {
        let oracle = MockOracle::new();
        oracle.push_text("first");
        oracle.push_text("second");

        let a = oracle.propose_fix(&request()).await.unwrap();
        let b = oracle.propose_fix(&request()).await.unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
        assert_eq!(oracle.requests_served(), 2);
    }

    #[tokio::test]
    async fn empty_queue_is_a_transport_failure() {
        let oracle = MockOracle::new();
        let err = oracle.propose_fix(&request()).await.unwrap_err();
        assert!(matches!(err, OracleError::Transport { .. }));
    }
}
