//! NATS-backed decision sources.
//!
//! [`NatsDecisionSource`] serves the agents whose `decision_source` names
//! an out-of-process agent runner. Each decision is one NATS
//! request/reply: the observation goes out as JSON and the runner answers
//! with a JSON [`Decision`].
//!
//! # Subject Convention
//!
//! - **Request:** `{decision_subject}.{agent_id}` (default prefix
//!   `agora.decide`)
//!
//! # Headers
//!
//! - `Agora-Source`: the registry key of the source
//! - `Authorization`: `Bearer <key>` when the API-key store holds a key
//!   for the source
//!
//! The deadline is enforced by dispatch, which drops the request future
//! when it passes.

use std::fmt;
use std::sync::Arc;

use agora_core::ApiKeyStore;
use agora_core::decision::{DecisionError, DecisionSource, parse_decision};
use agora_types::{AgentId, Decision, Observation};
use async_nats::HeaderMap;
use async_nats::client::RequestErrorKind;
use async_nats::connection::State;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

/// Header naming the source a request was sent for.
pub const SOURCE_HEADER: &str = "Agora-Source";

/// A decision source answered by an agent runner over NATS.
pub struct NatsDecisionSource {
    name: String,
    client: async_nats::Client,
    subject_prefix: String,
    api_keys: Arc<ApiKeyStore>,
}

impl NatsDecisionSource {
    /// A source registered as `name`, sending requests under
    /// `subject_prefix` on an already connected `client`.
    pub fn new(
        name: &str,
        client: async_nats::Client,
        subject_prefix: &str,
        api_keys: Arc<ApiKeyStore>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            client,
            subject_prefix: subject_prefix.to_owned(),
            api_keys,
        }
    }

    async fn request(&self, observation: &Observation) -> Result<Decision, DecisionError> {
        let agent_id = observation.self_state.id;
        let subject = decision_subject(&self.subject_prefix, agent_id);
        let payload = serde_json::to_vec(observation).map_err(|e| DecisionError::Internal {
            message: format!("failed to serialize observation for agent {agent_id}: {e}"),
        })?;
        let key = self.api_keys.get(&self.name);
        let headers = request_headers(&self.name, key.as_deref());

        let reply = self
            .client
            .request_with_headers(subject.clone(), headers, payload.into())
            .await
            .map_err(|e| request_error(&self.name, &subject, e.kind(), &e))?;

        debug!(
            tick = observation.tick,
            agent_id = %agent_id,
            source = %self.name,
            bytes = reply.payload.len(),
            "Received decision"
        );
        parse_decision(&reply.payload)
    }
}

impl fmt::Debug for NatsDecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatsDecisionSource")
            .field("name", &self.name)
            .field("subject_prefix", &self.subject_prefix)
            .finish_non_exhaustive()
    }
}

impl DecisionSource for NatsDecisionSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        matches!(self.client.connection_state(), State::Connected)
    }

    fn decide<'a>(
        &'a self,
        observation: &'a Observation,
    ) -> BoxFuture<'a, Result<Decision, DecisionError>> {
        self.request(observation).boxed()
    }
}

/// Subject a decision for `agent_id` is requested on.
pub fn decision_subject(prefix: &str, agent_id: AgentId) -> String {
    format!("{prefix}.{agent_id}")
}

/// Headers sent with every request for `source`.
pub fn request_headers(source: &str, api_key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SOURCE_HEADER, source);
    if let Some(key) = api_key {
        headers.insert("Authorization", format!("Bearer {key}").as_str());
    }
    headers
}

fn request_error(
    source: &str,
    subject: &str,
    kind: RequestErrorKind,
    detail: &dyn fmt::Display,
) -> DecisionError {
    match kind {
        RequestErrorKind::NoResponders => DecisionError::Unavailable {
            source_name: source.to_owned(),
        },
        RequestErrorKind::TimedOut => DecisionError::Internal {
            message: format!("request on {subject} timed out: {detail}"),
        },
        RequestErrorKind::Other => DecisionError::Internal {
            message: format!("request on {subject} failed: {detail}"),
        },
    }
}
