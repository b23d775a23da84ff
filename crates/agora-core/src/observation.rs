//! Observation building.
//!
//! Every observation is built from the tick-start snapshot, so all agents
//! perceive the same world regardless of dispatch order. Visibility is a
//! Manhattan radius around the observer; signals are the exception and are
//! visible wherever their own broadcast radius reaches.

use agora_agents::{AgentError, WorldState};
use agora_types::{
    ActionType, Agent, AgentId, EmploymentStatus, Event, NearbyAgent, NearbyName, NearbyResource,
    NearbyShelter, Observation, Position, RelationshipView, ScentReading, ScentTrace, SelfState,
};
use agora_world::{compass_direction, manhattan_distance, within_radius};
use rust_decimal::Decimal;

use crate::config::SimulationConfig;

/// Build the observation `agent_id` decides from.
///
/// `scents` may hold traces from anywhere; only those within the radius are
/// kept. `recent_events` is the tick history, newest last; the observer's
/// own events are picked out of it.
pub fn build_observation(
    world: &WorldState,
    agent_id: AgentId,
    scents: &[ScentTrace],
    recent_events: &[Event],
    config: &SimulationConfig,
) -> Result<Observation, AgentError> {
    let me = world.require_agent(agent_id)?;
    let here = me.position;
    let radius = config.observation.radius;
    let visible = |p: Position| within_radius(here, p, radius);

    let nearby_agents: Vec<NearbyAgent> = world
        .living_agents()
        .filter(|a| a.id != agent_id && visible(a.position))
        .map(|a| NearbyAgent {
            id: a.id,
            name: a.name.clone(),
            position: a.position,
            distance: manhattan_distance(here, a.position),
            direction: compass_direction(here, a.position),
            state: a.state,
            has_items: a.inventory.values().any(|n| *n > 0),
        })
        .collect();

    let nearby_resources = world
        .spawns
        .values()
        .filter(|s| visible(s.position))
        .map(|s| NearbyResource {
            spawn_id: s.id,
            position: s.position,
            resource_type: s.resource_type,
            amount: s.current_amount,
            distance: manhattan_distance(here, s.position),
            direction: compass_direction(here, s.position),
        })
        .collect();

    let nearby_shelters = world
        .shelters
        .values()
        .filter(|s| visible(s.position))
        .map(|s| NearbyShelter {
            shelter_id: s.id,
            position: s.position,
            can_sleep: s.can_sleep,
            owner: s.owner,
            distance: manhattan_distance(here, s.position),
        })
        .collect();

    let nearby_claims = world
        .claims
        .values()
        .filter(|c| visible(c.position))
        .cloned()
        .collect();

    let mut named_cells: Vec<Position> = world
        .names
        .iter()
        .map(|n| n.position)
        .filter(|p| visible(*p))
        .collect();
    named_cells.dedup();
    let nearby_names = named_cells
        .into_iter()
        .filter_map(|p| world.names.consensus(p))
        .map(|n| NearbyName {
            position: n.position,
            name: n.name.clone(),
            usage_count: n.usage_count,
        })
        .collect();

    let nearby_signals = world
        .signals
        .iter()
        .filter(|s| within_radius(s.position, here, s.radius))
        .cloned()
        .collect();

    let settings = config.scent_settings();
    let tick = world.tick;
    let scents = scents
        .iter()
        .filter(|s| visible(s.position))
        .map(|s| ScentReading {
            position: s.position,
            agent_id: s.agent_id,
            tick: s.tick,
            strength: settings.strength(tick, s.tick),
            direction: compass_direction(here, s.position),
        })
        .collect();

    let limit = config.observation.recent_event_limit;
    let mut own_events: Vec<Event> = recent_events
        .iter()
        .rev()
        .filter(|e| e.agent_id == Some(agent_id))
        .take(limit)
        .cloned()
        .collect();
    own_events.reverse();

    let relationships = world
        .relationships
        .held_by(agent_id)
        .into_iter()
        .map(|r| RelationshipView {
            agent_id: r.to,
            trust: r.trust,
        })
        .collect();

    let knowledge = world
        .knowledge
        .known_by(agent_id)
        .into_iter()
        .cloned()
        .collect();

    let employment = world
        .employments
        .values()
        .filter(|e| {
            matches!(e.status, EmploymentStatus::Offered | EmploymentStatus::Active)
                && (e.employer == agent_id || e.worker == Some(agent_id))
        })
        .cloned()
        .collect();

    let job_offers = world
        .employments
        .values()
        .filter(|e| {
            e.status == EmploymentStatus::Offered && e.employer != agent_id && visible(e.position)
        })
        .cloned()
        .collect();

    let credentials = world
        .credentials
        .values()
        .filter(|c| c.issuer == agent_id || c.subject == agent_id)
        .cloned()
        .collect();

    let mut observation = Observation {
        tick,
        world_size: world.world_size,
        self_state: self_state(me),
        nearby_agents,
        nearby_resources,
        nearby_shelters,
        nearby_claims,
        nearby_names,
        nearby_signals,
        scents,
        recent_events: own_events,
        relationships,
        knowledge,
        employment,
        job_offers,
        credentials,
        last_result: world.last_results.get(&agent_id).cloned(),
        valid_actions: Vec::new(),
    };
    observation.valid_actions = valid_actions(world, me, &observation, config);
    Ok(observation)
}

fn self_state(agent: &Agent) -> SelfState {
    SelfState {
        id: agent.id,
        name: agent.name.clone(),
        position: agent.position,
        hunger: agent.hunger,
        energy: agent.energy,
        health: agent.health,
        balance: agent.balance,
        state: agent.state,
        personality: agent.personality,
        inventory: agent.inventory.clone(),
        last_action: agent.last_action,
    }
}

/// Actions whose preconditions hold right now, in catalogue order.
///
/// This is a hint for decision sources, not a guarantee: competition for
/// the same stock can still make a listed action fail at application.
fn valid_actions(
    world: &WorldState,
    me: &Agent,
    observation: &Observation,
    config: &SimulationConfig,
) -> Vec<ActionType> {
    let actions = &config.actions;
    let nearby = &observation.nearby_agents;
    let any_within = |range: u32| nearby.iter().any(|a| a.distance <= range);
    let holds_items = me.inventory.values().any(|n| *n > 0);

    ActionType::ALL
        .into_iter()
        .filter(|action| match action {
            ActionType::Move
            | ActionType::Sleep
            | ActionType::Work
            | ActionType::Idle
            | ActionType::NameLocation
            | ActionType::Signal => true,
            ActionType::Gather => observation.resource_here().is_some(),
            ActionType::Eat => observation.has_food(),
            ActionType::Trade => {
                holds_items
                    && nearby
                        .iter()
                        .any(|a| (1..=actions.trade_range).contains(&a.distance))
            }
            ActionType::Harm => any_within(1),
            ActionType::Steal => nearby.iter().any(|a| a.distance <= 1 && a.has_items),
            ActionType::Deceive
            | ActionType::ShareInfo
            | ActionType::Gossip
            | ActionType::IssueCredential => any_within(actions.communication_range),
            ActionType::OfferJob => me.balance > Decimal::ZERO,
            ActionType::AcceptJob => {
                !observation.job_offers.is_empty() && world.active_job_of(me.id).is_none()
            }
            ActionType::PayWorker => observation
                .employment
                .iter()
                .any(|e| e.employer == me.id && e.status == EmploymentStatus::Active),
            ActionType::Claim => world.claim_at(me.position).is_none_or(|c| {
                c.claimant != me.id && world.agent(c.claimant).is_none_or(|a| !a.is_alive())
            }),
            ActionType::SpawnOffspring => {
                any_within(1)
                    && me.hunger >= actions.offspring_min_vitals
                    && me.energy >= actions.offspring_min_vitals
                    && me.balance >= actions.offspring_endowment
            }
            ActionType::RevokeCredential => observation
                .credentials
                .iter()
                .any(|c| c.issuer == me.id && c.revoked_tick.is_none()),
        })
        .collect()
}
