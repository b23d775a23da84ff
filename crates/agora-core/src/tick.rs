//! One tick of the simulation, start to commit.
//!
//! Each tick runs through these phases:
//!
//! 1. **Snapshot** -- clone the authoritative world with the new tick
//!    number. Observations and handlers read only this snapshot.
//!
//! 2. **Observe** -- read the scent traces around every living agent once,
//!    then build one [`Observation`] per agent.
//!
//! 3. **Dispatch** -- fan the observations out to the agents' decision
//!    sources (see [`dispatch`](crate::dispatch)).
//!
//! 4. **Resolve** -- resolve and apply each decision in ascending agent-id
//!    order against a working copy. A result that conflicts with an earlier
//!    one is turned into a failed result; nothing is retried.
//!
//! 5. **Maintain** -- regrowth, needs decay, deaths, pruning, discovery.
//!
//! 6. **Commit** -- hand the working copy and the tick's events to the
//!    world store, write scent traces, then publish the events.
//!
//! The caller keeps its authoritative world until [`run_tick`] returns
//! `Ok`, so a failed commit leaves no partial tick behind.
//!
//! [`Observation`]: agora_types::Observation

use std::collections::BTreeSet;
use std::sync::Arc;

use agora_agents::{AgentError, WorldState, failure, run_maintenance};
use agora_types::{ActionIntent, Event, EventType, Position, ScentTrace};
use agora_world::positions_within_radius;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::dispatch::{DecisionRequest, dispatch_decisions};
use crate::events::EventBus;
use crate::observation::build_observation;
use crate::registry::SimulationContext;
use crate::rng::RngStream;
use crate::store::{ScentStore, StoreError, WorldStore};

/// Errors that abort a tick. Agent-level failures never do.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A store could not be read or written.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The world state was inconsistent.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Number of living agents at end of tick.
    pub agents_alive: usize,
    /// Agents who died during this tick.
    pub deaths: usize,
    /// Decisions replaced by the fallback strategy.
    pub fallbacks: usize,
    /// Actions that failed validation or lost a conflict.
    pub failed_actions: usize,
    /// Events committed with the tick.
    pub events_emitted: usize,
}

/// Everything a committed tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The new authoritative world.
    pub world: WorldState,
    /// Counts for logs and the control surface.
    pub summary: TickSummary,
    /// Events in commit order.
    pub events: Vec<Event>,
}

/// Run the tick after `world.tick` and commit it.
///
/// `recent` is the tail of committed events that observations draw each
/// agent's own recent history from.
pub async fn run_tick(
    ctx: &Arc<SimulationContext>,
    world: &WorldState,
    world_store: &dyn WorldStore,
    scent_store: &dyn ScentStore,
    bus: &EventBus,
    recent: &[Event],
) -> Result<TickOutcome, TickError> {
    let config = ctx.config();
    let tick = world.tick.saturating_add(1);
    let mut snapshot = world.clone();
    snapshot.tick = tick;
    let mut working = snapshot.clone();

    debug!(tick, agents = snapshot.living_count(), "Tick started");

    // Observe
    let mut cells: BTreeSet<Position> = BTreeSet::new();
    for agent in snapshot.living_agents() {
        cells.extend(positions_within_radius(
            agent.position,
            config.observation.radius,
            snapshot.world_size,
        ));
    }
    let cells: Vec<Position> = cells.into_iter().collect();
    let scents: Vec<ScentTrace> = scent_store.scents_at(&cells).await?;

    let mut requests = Vec::new();
    for agent in snapshot.living_agents() {
        let observation = build_observation(&snapshot, agent.id, &scents, recent, config)?;
        requests.push(DecisionRequest {
            observation,
            source: agent.decision_source.clone(),
        });
    }

    // Dispatch
    let report = dispatch_decisions(ctx, requests).await;
    let mut events = report.events;
    let mut failed_actions: usize = 0;
    let mut scent_writes: Vec<ScentTrace> = Vec::new();

    // Resolve, lowest agent id first
    let memory_capacity = config.vitals.memory_capacity;
    for (agent_id, dispatched) in report.decisions {
        let intent = ActionIntent::new(agent_id, dispatched.decision.action, tick);
        let mut rng = ctx.rng().stream(tick, agent_id, RngStream::Resolution);
        let result = ctx.resolver().resolve(&intent, &snapshot, &mut rng);

        let result = match working.apply_result(&intent, &result, &snapshot, memory_capacity) {
            Ok(applied) => {
                scent_writes.extend(applied.scents);
                result
            }
            Err(error) => {
                debug!(
                    tick,
                    agent_id = %agent_id,
                    action = %intent.action_type(),
                    error = %error,
                    "Result conflicts with an earlier one"
                );
                let rejected = failure(&intent, &error);
                working.record_outcome(agent_id, intent.action_type(), false, rejected.error.clone());
                rejected
            }
        };
        if !result.success {
            failed_actions = failed_actions.saturating_add(1);
        }
        events.extend(result.events);
    }

    // Maintain
    let maintenance = run_maintenance(
        &mut working,
        &config.actions,
        &config.vitals,
        &config.knowledge,
    );
    events.extend(maintenance.events);

    let agents_alive = working.living_count();
    events.push(Event::new(
        EventType::TickCompleted,
        tick,
        None,
        json!({
            "agents_alive": agents_alive,
            "deaths": maintenance.deaths.len(),
            "fallbacks": report.fallbacks,
            "failed_actions": failed_actions,
        }),
    ));

    // Commit
    world_store.commit_tick(tick, &working, &events).await?;
    for trace in scent_writes {
        if let Err(e) = scent_store.leave_scent(trace).await {
            warn!(tick, position = %trace.position, error = %e, "Scent write failed");
        }
    }
    bus.publish_all(events.iter().cloned());

    let summary = TickSummary {
        tick,
        agents_alive,
        deaths: maintenance.deaths.len(),
        fallbacks: report.fallbacks,
        failed_actions,
        events_emitted: events.len(),
    };
    info!(
        tick,
        agents_alive = summary.agents_alive,
        deaths = summary.deaths,
        fallbacks = summary.fallbacks,
        failed_actions = summary.failed_actions,
        events = summary.events_emitted,
        "Tick completed"
    );

    Ok(TickOutcome {
        world: working,
        summary,
        events,
    })
}
