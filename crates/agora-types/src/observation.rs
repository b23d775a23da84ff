//! The observation payload handed to decision sources each tick.
//!
//! An observation is a bounded-radius snapshot taken at tick start. It is the
//! entire input contract of a decision source: anything an agent can reason
//! about must be in here.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    ActionType, AgentStatus, CompassDirection, Personality, ResourceType, ScentStrength,
};
use crate::ids::{AgentId, ShelterId, SpawnId};
use crate::structs::{
    Credential, Employment, Event, KnowledgeRecord, LocationClaim, Position, Signal,
};

/// Everything an agent perceives at the start of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Observation {
    /// Tick being decided.
    pub tick: u64,
    /// Side length of the square world.
    pub world_size: i32,
    /// The observing agent.
    pub self_state: SelfState,
    /// Living agents within the observation radius.
    pub nearby_agents: Vec<NearbyAgent>,
    /// Spawns within the observation radius.
    pub nearby_resources: Vec<NearbyResource>,
    /// Shelters within the observation radius.
    pub nearby_shelters: Vec<NearbyShelter>,
    /// Claims within the observation radius.
    pub nearby_claims: Vec<LocationClaim>,
    /// Consensus names within the observation radius.
    pub nearby_names: Vec<NearbyName>,
    /// Signals whose broadcast radius reaches the observer.
    pub nearby_signals: Vec<Signal>,
    /// Non-expired scent traces within the observation radius.
    pub scents: Vec<ScentReading>,
    /// The observer's own most recent events, newest last.
    pub recent_events: Vec<Event>,
    /// Trust the observer holds toward others.
    pub relationships: Vec<RelationshipView>,
    /// The observer's knowledge of other agents.
    pub knowledge: Vec<KnowledgeRecord>,
    /// Contracts the observer is party to.
    pub employment: Vec<Employment>,
    /// Open offers posted by nearby agents.
    pub job_offers: Vec<Employment>,
    /// Credentials issued by or about the observer.
    pub credentials: Vec<Credential>,
    /// Outcome of the observer's previous action.
    pub last_result: Option<LastActionResult>,
    /// Actions that can currently pass validation.
    pub valid_actions: Vec<ActionType>,
}

impl Observation {
    /// Whether `action` is currently valid for the observer.
    pub fn can(&self, action: ActionType) -> bool {
        self.valid_actions.contains(&action)
    }

    /// Whether the observer holds at least one consumable item.
    pub fn has_food(&self) -> bool {
        self.self_state
            .inventory
            .iter()
            .any(|(item, count)| item.is_consumable() && *count > 0)
    }

    /// The best consumable item held, preferring food over water.
    pub fn best_food(&self) -> Option<ResourceType> {
        [ResourceType::Food, ResourceType::Water]
            .into_iter()
            .find(|item| self.self_state.inventory.get(item).copied().unwrap_or(0) > 0)
    }

    /// The spawn at the observer's cell, if it has anything left.
    pub fn resource_here(&self) -> Option<&NearbyResource> {
        self.nearby_resources
            .iter()
            .find(|r| r.position == self.self_state.position && r.amount > 0)
    }
}

/// The observing agent's own status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SelfState {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Current cell.
    pub position: Position,
    /// Satiety.
    pub hunger: f64,
    /// Energy.
    pub energy: f64,
    /// Health.
    pub health: f64,
    /// Currency held.
    #[ts(as = "String")]
    pub balance: Decimal,
    /// Behavioral state.
    pub state: AgentStatus,
    /// Personality trait, if any.
    pub personality: Option<Personality>,
    /// Items held.
    pub inventory: BTreeMap<ResourceType, u32>,
    /// Previous action.
    pub last_action: Option<ActionType>,
}

/// Another living agent in view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyAgent {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Cell.
    pub position: Position,
    /// Manhattan distance from the observer.
    pub distance: u32,
    /// Heading from the observer.
    pub direction: CompassDirection,
    /// Behavioral state.
    pub state: AgentStatus,
    /// Whether the agent holds any items.
    pub has_items: bool,
}

/// A spawn in view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyResource {
    /// Spawn id.
    pub spawn_id: SpawnId,
    /// Cell.
    pub position: Position,
    /// What it produces.
    pub resource_type: ResourceType,
    /// Units available.
    pub amount: u32,
    /// Manhattan distance from the observer.
    pub distance: u32,
    /// Heading from the observer.
    pub direction: CompassDirection,
}

/// A shelter in view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyShelter {
    /// Shelter id.
    pub shelter_id: ShelterId,
    /// Cell.
    pub position: Position,
    /// Whether sleeping here gives the bonus.
    pub can_sleep: bool,
    /// Owner, if any.
    pub owner: Option<AgentId>,
    /// Manhattan distance from the observer.
    pub distance: u32,
}

/// The consensus name of a cell in view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyName {
    /// Named cell.
    pub position: Position,
    /// Consensus name.
    pub name: String,
    /// Usage count of the consensus name.
    pub usage_count: u32,
}

/// A scent trace with its freshness derived against the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScentReading {
    /// Marked cell.
    pub position: Position,
    /// Agent that left it.
    pub agent_id: AgentId,
    /// Tick it was left.
    pub tick: u64,
    /// Derived freshness.
    pub strength: ScentStrength,
    /// Heading from the observer.
    pub direction: CompassDirection,
}

/// The observer's trust toward another agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RelationshipView {
    /// Other agent.
    pub agent_id: AgentId,
    /// Trust in `[-100, 100]`.
    pub trust: f64,
}

/// The outcome of the observer's previous action, fed back as
/// agent-visible feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LastActionResult {
    /// Action attempted.
    pub action: ActionType,
    /// Whether it took effect.
    pub success: bool,
    /// Error text when it did not.
    pub error: Option<String>,
}
