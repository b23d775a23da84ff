//! The decision source contract.
//!
//! During dispatch the scheduler presents each living agent's
//! [`Observation`] to the [`DecisionSource`] registered under the agent's
//! `decision_source` key and awaits a [`Decision`]. A source may be an
//! out-of-process LLM agent, a scripted strategy, or a test double. Whatever
//! it is, a failure never reaches resolution: dispatch substitutes the
//! fallback strategy's decision instead.

use agora_types::{AgentId, Decision, Observation};
use futures::future::BoxFuture;

/// Why a decision source did not produce a decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// The source did not answer within the deadline.
    #[error("agent {agent_id} timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The agent that timed out.
        agent_id: AgentId,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// The source answered with something that is not a decision.
    #[error("malformed decision: {message}")]
    Malformed {
        /// What was wrong with the response.
        message: String,
    },

    /// The source cannot take requests right now.
    #[error("decision source unavailable: {source_name}")]
    Unavailable {
        /// Registry key of the source.
        source_name: String,
    },

    /// Any other failure inside the source.
    #[error("decision source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

impl DecisionError {
    /// Short tag used in fallback events and counters.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Malformed { .. } => "malformed",
            Self::Unavailable { .. } => "unavailable",
            Self::Internal { .. } => "error",
        }
    }
}

/// A source of agent decisions.
pub trait DecisionSource: Send + Sync {
    /// Registry key, matched against an agent's `decision_source`.
    fn name(&self) -> &str;

    /// Whether the source can take requests. Dispatch skips straight to the
    /// fallback for an unavailable source.
    fn is_available(&self) -> bool {
        true
    }

    /// Decide what the observing agent does this tick.
    ///
    /// Implementations need not enforce a deadline; dispatch cancels the
    /// returned future when the deadline passes.
    fn decide<'a>(
        &'a self,
        observation: &'a Observation,
    ) -> BoxFuture<'a, Result<Decision, DecisionError>>;
}

/// Parse a decision from a JSON response body.
pub fn parse_decision(raw: &[u8]) -> Result<Decision, DecisionError> {
    serde_json::from_slice(raw).map_err(|e| DecisionError::Malformed {
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agora_types::ActionParams;

    use super::*;

    #[test]
    fn parses_a_tagged_action() {
        let decision =
            parse_decision(br#"{"action":{"action":"move","x":4,"y":2},"reasoning":"north"}"#)
                .unwrap();
        assert_eq!(decision.action, ActionParams::Move { x: 4, y: 2 });
        assert_eq!(decision.reasoning.as_deref(), Some("north"));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_decision(b"I think I will go north").unwrap_err();
        assert_eq!(err.kind(), "malformed");

        let unknown = parse_decision(br#"{"action":{"action":"teleport"},"reasoning":null}"#);
        assert!(matches!(unknown, Err(DecisionError::Malformed { .. })));
    }

    #[test]
    fn timeout_message_names_the_deadline() {
        let err = DecisionError::Timeout {
            agent_id: AgentId::from_random_bytes([1; 16]),
            deadline_ms: 250,
        };
        assert!(err.to_string().ends_with("(deadline: 250ms)"));
        assert_eq!(err.kind(), "timeout");
    }
}
