//! At-most-once arbitration of tool-confirmation responses.
//!
//! Requests are tracked by correlation id. Whichever participant answers
//! first wins the test-and-clear; everyone else gets a duplicate signal and
//! causes no host call. The bus publish happens outside the critical section.

use std::collections::HashMap;

use agent_bridge_schema::OPTION_PROCEED_ONCE;
use parking_lot::Mutex;

use crate::host::{BusMessage, HostHandle, ToolConfirmation};

/// Where a confirmation response originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    FramedSocket,
    Sse,
    Host,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::FramedSocket => "framed-socket",
            ResponseSource::Sse => "sse",
            ResponseSource::Host => "host",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved { confirmed: bool },
    /// The request was already resolved (or never existed); expected under
    /// races, deliberately not an error.
    Duplicate,
}

#[derive(Debug)]
struct PendingConfirmation {
    tool_name: String,
}

pub struct ConfirmationArbiter {
    host: HostHandle,
    pending: Mutex<HashMap<String, PendingConfirmation>>,
}

impl ConfirmationArbiter {
    pub fn new(host: HostHandle) -> Self {
        Self {
            host,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Starts tracking an outstanding request. Re-tracking an id replaces the
    /// previous entry.
    pub fn track(&self, confirmation: &ToolConfirmation) {
        let replaced = self.pending.lock().insert(
            confirmation.correlation_id.clone(),
            PendingConfirmation {
                tool_name: confirmation.tool_name.clone(),
            },
        );
        if replaced.is_some() {
            tracing::debug!(
                correlation_id = %confirmation.correlation_id,
                "confirmation re-requested under the same correlation id"
            );
        }
    }

    /// Admits the first response for `correlation_id` and publishes the
    /// decision to the host bus; later responses are discarded.
    pub fn resolve(
        &self,
        correlation_id: &str,
        option_id: &str,
        source: ResponseSource,
    ) -> ResolveOutcome {
        let entry = self.pending.lock().remove(correlation_id);
        let Some(pending) = entry else {
            tracing::debug!(
                correlation_id,
                source = source.as_str(),
                "ignoring duplicate or unknown confirmation response"
            );
            return ResolveOutcome::Duplicate;
        };

        // proceed_once is the only affirmative option; unknown ids fail closed.
        let confirmed = option_id == OPTION_PROCEED_ONCE;
        tracing::debug!(
            correlation_id,
            tool = %pending.tool_name,
            option_id,
            confirmed,
            source = source.as_str(),
            "confirmation resolved"
        );
        if let Err(err) = self.host.publish(BusMessage::ToolConfirmationResponse {
            correlation_id: correlation_id.to_string(),
            confirmed,
        }) {
            tracing::error!(error = %err, correlation_id, "failed to publish confirmation response");
        }
        ResolveOutcome::Resolved { confirmed }
    }

    /// Drops a pending entry without publishing; used when the host resolves
    /// the dialog on its own (terminal answer, cancellation).
    pub fn discard(&self, correlation_id: &str) -> bool {
        self.pending.lock().remove(correlation_id).is_some()
    }

    /// Clears every pending entry (shutdown). Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let count = pending.len();
        pending.clear();
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ToolConfirmationDetail;

    fn confirmation(id: &str) -> ToolConfirmation {
        ToolConfirmation {
            correlation_id: id.to_string(),
            tool_name: "run_shell".to_string(),
            title: None,
            input: None,
            detail: ToolConfirmationDetail::Exec {
                command: "ls".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn first_response_wins_and_publishes_once() {
        let (host, _input_rx) = HostHandle::new("sess", None);
        let mut bus = host.subscribe_bus();
        let arbiter = ConfirmationArbiter::new(host);
        arbiter.track(&confirmation("c1"));

        assert_eq!(
            arbiter.resolve("c1", "proceed_once", ResponseSource::FramedSocket),
            ResolveOutcome::Resolved { confirmed: true }
        );
        assert_eq!(
            arbiter.resolve("c1", "cancel", ResponseSource::Sse),
            ResolveOutcome::Duplicate
        );

        match bus.recv().await.unwrap() {
            BusMessage::ToolConfirmationResponse {
                correlation_id,
                confirmed,
            } => {
                assert_eq!(correlation_id, "c1");
                assert!(confirmed);
            }
            other => panic!("unexpected bus message: {other:?}"),
        }
        assert!(bus.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_affirmative_options_fail_closed() {
        let (host, _input_rx) = HostHandle::new("sess", None);
        let _bus = host.subscribe_bus();
        let arbiter = ConfirmationArbiter::new(host);

        for option in ["cancel", "proceed_always", "definitely-not-an-option"] {
            let id = format!("c-{option}");
            arbiter.track(&confirmation(&id));
            assert_eq!(
                arbiter.resolve(&id, option, ResponseSource::Sse),
                ResolveOutcome::Resolved { confirmed: false }
            );
        }
    }

    #[tokio::test]
    async fn unknown_correlation_is_a_duplicate() {
        let (host, _input_rx) = HostHandle::new("sess", None);
        let arbiter = ConfirmationArbiter::new(host);
        assert_eq!(
            arbiter.resolve("never-tracked", "proceed_once", ResponseSource::Host),
            ResolveOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn discard_suppresses_later_responses_without_publishing() {
        let (host, _input_rx) = HostHandle::new("sess", None);
        let mut bus = host.subscribe_bus();
        let arbiter = ConfirmationArbiter::new(host);
        arbiter.track(&confirmation("c2"));

        assert!(arbiter.discard("c2"));
        assert!(!arbiter.discard("c2"));
        assert_eq!(
            arbiter.resolve("c2", "proceed_once", ResponseSource::Sse),
            ResolveOutcome::Duplicate
        );
        assert!(bus.try_recv().is_err());
    }

    #[tokio::test]
    async fn clear_empties_the_pending_set() {
        let (host, _input_rx) = HostHandle::new("sess", None);
        let arbiter = ConfirmationArbiter::new(host);
        arbiter.track(&confirmation("a"));
        arbiter.track(&confirmation("b"));
        assert_eq!(arbiter.clear(), 2);
        assert_eq!(arbiter.pending_count(), 0);
    }
}
