//! End-of-tick world upkeep.
//!
//! Runs after every result is applied: resources regrow, needs decay,
//! stale knowledge and expired signals are dropped, agents standing close
//! together discover each other, and agents without health die. Contracts
//! involving a newly dead agent are cancelled and their escrow refunded to a
//! surviving employer.

use agora_types::{AgentId, EmploymentStatus, Event, EventType, SharedInfo};
use agora_world::{manhattan_distance, resource};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{ActionConfig, KnowledgeConfig, VitalsConfig};
use crate::employment;
use crate::knowledge::UpsertOutcome;
use crate::vitals::{NeedsOutcome, apply_needs_decay};
use crate::world_state::WorldState;

/// What maintenance did during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceReport {
    /// Events produced, in order.
    pub events: Vec<Event>,
    /// Agents that died this tick.
    pub deaths: Vec<AgentId>,
    /// Units regrown across all spawns.
    pub regenerated: u64,
    /// Knowledge records dropped.
    pub knowledge_pruned: usize,
    /// Signals that expired.
    pub signals_expired: usize,
    /// New acquaintances made through proximity.
    pub discoveries: usize,
}

/// Run every maintenance step against the working copy, in order.
pub fn run_maintenance(
    world: &mut WorldState,
    actions: &ActionConfig,
    vitals: &VitalsConfig,
    knowledge: &KnowledgeConfig,
) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();
    regenerate_resources(world, &mut report);
    decay_needs(world, vitals, &mut report);
    cancel_orphaned_contracts(world, &report.deaths);
    prune_knowledge(world, knowledge, &mut report);
    expire_signals(world, actions.signal_ttl_ticks, &mut report);
    discover_neighbours(world, knowledge.discovery_radius, &mut report);
    report
}

fn regenerate_resources(world: &mut WorldState, report: &mut MaintenanceReport) {
    for spawn in world.spawns.values_mut() {
        match resource::regenerate(spawn) {
            Ok(grown) => report.regenerated = report.regenerated.saturating_add(u64::from(grown)),
            Err(e) => warn!(spawn_id = %spawn.id, error = %e, "Resource regeneration failed"),
        }
    }
}

fn decay_needs(world: &mut WorldState, vitals: &VitalsConfig, report: &mut MaintenanceReport) {
    let tick = world.tick;
    for agent in world.agents.values_mut() {
        let outcome = apply_needs_decay(agent, vitals);
        if !outcome.died {
            continue;
        }
        let cause = death_cause(outcome);
        debug!(agent_id = %agent.id, cause, "Agent died");
        report.deaths.push(agent.id);
        report.events.push(Event::new(
            EventType::AgentDied,
            tick,
            Some(agent.id),
            json!({
                "name": agent.name,
                "position": agent.position,
                "cause": cause,
                "generation": agent.generation,
            }),
        ));
    }
}

const fn death_cause(outcome: NeedsOutcome) -> &'static str {
    if outcome.starving {
        "starvation"
    } else if outcome.exhausted {
        "exhaustion"
    } else {
        "injury"
    }
}

fn cancel_orphaned_contracts(world: &mut WorldState, dead: &[AgentId]) {
    if dead.is_empty() {
        return;
    }
    for contract in world.employments.values_mut() {
        let open = matches!(
            contract.status,
            EmploymentStatus::Offered | EmploymentStatus::Active
        );
        let employer_dead = dead.contains(&contract.employer);
        let worker_dead = contract.worker.is_some_and(|w| dead.contains(&w));
        if !open || !(employer_dead || worker_dead) {
            continue;
        }
        let refund = employment::cancel(contract);
        if !employer_dead {
            if let Some(employer) = world.agents.get_mut(&contract.employer) {
                employer.balance = employer.balance.saturating_add(refund.amount);
            }
        }
        *contract = refund.employment;
    }
}

fn prune_knowledge(world: &mut WorldState, config: &KnowledgeConfig, report: &mut MaintenanceReport) {
    let departed: Vec<AgentId> = world
        .agents
        .values()
        .filter(|a| !a.is_alive())
        .map(|a| a.id)
        .collect();
    report.knowledge_pruned = world
        .knowledge
        .prune(world.tick, config.stale_after_ticks, &departed);
}

fn expire_signals(world: &mut WorldState, ttl_ticks: u64, report: &mut MaintenanceReport) {
    let tick = world.tick;
    let before = world.signals.len();
    world
        .signals
        .retain(|s| tick.saturating_sub(s.tick) < ttl_ticks);
    report.signals_expired = before.saturating_sub(world.signals.len());
}

fn discover_neighbours(world: &mut WorldState, radius: u32, report: &mut MaintenanceReport) {
    let living: Vec<_> = world
        .living_agents()
        .map(|a| (a.id, a.position))
        .collect();
    let tick = world.tick;

    for (observer, observer_pos) in &living {
        for (known, known_pos) in &living {
            if observer == known || manhattan_distance(*observer_pos, *known_pos) > radius {
                continue;
            }
            let info = SharedInfo {
                last_known_position: Some(*known_pos),
                ..SharedInfo::default()
            };
            let outcome = world
                .knowledge
                .record_direct_discovery(*observer, *known, info, tick);
            if outcome == UpsertOutcome::Inserted {
                report.discoveries = report.discoveries.saturating_add(1);
                report.events.push(Event::new(
                    EventType::AgentDiscovered,
                    tick,
                    Some(*observer),
                    json!({ "known": known, "position": known_pos }),
                ));
            }
        }
    }
}
