//! Concurrent decision dispatch with a bounded fan-out and per-request
//! deadline.
//!
//! Every living agent's observation goes to its decision source in its own
//! task. A semaphore caps how many requests are in flight; each request's
//! deadline starts once it holds a permit, so queueing behind the cap does
//! not eat into an agent's time. Whatever goes wrong (timeout, malformed
//! answer, unavailable or unknown source, a panicking task) the agent gets
//! the fallback strategy's decision instead and a `decision_fallback` event
//! records why. Requests are never retried.
//!
//! All tasks are joined before this returns, so no decision call outlives
//! the dispatch phase of its tick.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use agora_types::{AgentId, Decision, Event, EventType, Observation};
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::decision::DecisionError;
use crate::registry::SimulationContext;

/// One agent's decision request.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// What the agent perceives.
    pub observation: Observation,
    /// Registry key of the agent's decision source.
    pub source: String,
}

/// The decision an agent will act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// The decision.
    pub decision: Decision,
    /// Source that was asked.
    pub source: String,
    /// Why the fallback was used, if it was.
    pub fallback: Option<String>,
}

/// Outcome of dispatching one tick's requests.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// One decision per requesting agent.
    pub decisions: BTreeMap<AgentId, Dispatched>,
    /// `decision_fallback` events, in agent-id order.
    pub events: Vec<Event>,
    /// Number of fallbacks used.
    pub fallbacks: usize,
}

/// Ask every agent's source for a decision, concurrently.
pub async fn dispatch_decisions(
    ctx: &Arc<SimulationContext>,
    requests: Vec<DecisionRequest>,
) -> DispatchReport {
    let dispatch = &ctx.config().dispatch;
    let deadline = Duration::from_millis(dispatch.decision_timeout_ms);
    let deadline_ms = dispatch.decision_timeout_ms;
    let permits = Arc::new(Semaphore::new(dispatch.max_in_flight.max(1)));

    let mut outcomes: BTreeMap<AgentId, Result<Decision, DecisionError>> = BTreeMap::new();
    let mut pending: BTreeMap<AgentId, DecisionRequest> = BTreeMap::new();
    let mut tasks = JoinSet::new();

    for request in requests {
        let agent_id = request.observation.self_state.id;
        let source = ctx.source(&request.source).filter(|s| s.is_available());
        if let Some(source) = source {
            let observation = request.observation.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    let closed = DecisionError::Internal {
                        message: "dispatch closed".to_owned(),
                    };
                    return (agent_id, Err(closed));
                };
                let outcome = match timeout(deadline, source.decide(&observation)).await {
                    Ok(result) => result,
                    Err(_) => Err(DecisionError::Timeout {
                        agent_id,
                        deadline_ms,
                    }),
                };
                (agent_id, outcome)
            });
        } else {
            outcomes.insert(
                agent_id,
                Err(DecisionError::Unavailable {
                    source_name: request.source.clone(),
                }),
            );
        }
        pending.insert(agent_id, request);
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((agent_id, outcome)) => {
                outcomes.insert(agent_id, outcome);
            }
            Err(e) => warn!(error = %e, "decision task failed"),
        }
    }

    let mut report = DispatchReport::default();
    for (agent_id, request) in pending {
        let outcome = outcomes.remove(&agent_id).unwrap_or_else(|| {
            Err(DecisionError::Internal {
                message: "decision task did not complete".to_owned(),
            })
        });
        match outcome {
            Ok(decision) => {
                ctx.record_decision(&request.source, None);
                debug!(
                    agent_id = %agent_id,
                    source = %request.source,
                    action = %decision.action.action_type(),
                    "decision received"
                );
                report.decisions.insert(
                    agent_id,
                    Dispatched {
                        decision,
                        source: request.source,
                        fallback: None,
                    },
                );
            }
            Err(error) => {
                let dispatched = fall_back(ctx, &request, &error, &mut report.events);
                report.fallbacks = report.fallbacks.saturating_add(1);
                report.decisions.insert(agent_id, dispatched);
            }
        }
    }
    report
}

fn fall_back(
    ctx: &SimulationContext,
    request: &DecisionRequest,
    error: &DecisionError,
    events: &mut Vec<Event>,
) -> Dispatched {
    let observation = &request.observation;
    let agent_id = observation.self_state.id;
    let decision = ctx.fallback_decision(observation);
    let reason = error.kind();

    warn!(
        agent_id = %agent_id,
        tick = observation.tick,
        source = %request.source,
        reason,
        error = %error,
        "decision failed, using fallback"
    );
    ctx.record_decision(&request.source, Some(reason));
    events.push(Event::new(
        EventType::DecisionFallback,
        observation.tick,
        Some(agent_id),
        json!({
            "source": request.source,
            "reason": reason,
            "error": error.to_string(),
            "fallback": ctx.fallback_name(),
            "action": decision.action.action_type(),
        }),
    ));

    Dispatched {
        decision,
        source: request.source.clone(),
        fallback: Some(reason.to_owned()),
    }
}
