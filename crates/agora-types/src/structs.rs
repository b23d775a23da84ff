//! Core entity structs: agents, spawns, shelters, the social graph, the
//! economy, and the append-only event record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    ActionType, AgentStatus, DiscoveryType, EmploymentStatus, EventType, MemoryKind, PaymentType, Personality,
    ResourceType, Valence,
};
use crate::ids::{
    AgentId, CredentialId, EmploymentId, EventId, MemoryId, ShelterId, SignalId, SpawnId,
};

/// Lowest value any vital sign can take.
pub const VITAL_MIN: f64 = 0.0;

/// Highest value any vital sign can take.
pub const VITAL_MAX: f64 = 100.0;

// ---------------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------------

/// A cell on the square grid. Valid cells satisfy `0 <= x, y < world_size`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Column, growing eastward.
    pub x: i32,
    /// Row, growing southward.
    pub y: i32,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// An autonomous agent living on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Unique identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Current cell.
    pub position: Position,
    /// Satiety in `[0, 100]`. 100 is full, 0 is starving.
    pub hunger: f64,
    /// Stamina in `[0, 100]`.
    pub energy: f64,
    /// Health in `[0, 100]`. The agent dies at 0.
    pub health: f64,
    /// Currency held. Never negative.
    #[ts(as = "String")]
    pub balance: Decimal,
    /// Behavioral state.
    pub state: AgentStatus,
    /// Fixed personality trait, if one was assigned.
    pub personality: Option<Personality>,
    /// Registry key of the decision source driving this agent.
    pub decision_source: String,
    /// Items held, by type. Zero counts are removed.
    pub inventory: BTreeMap<ResourceType, u32>,
    /// Action resolved for this agent on the previous tick.
    pub last_action: Option<ActionType>,
    /// Tick at which the agent appeared.
    pub born_at_tick: u64,
    /// Zero for seeded agents, parent generation plus one for offspring.
    pub generation: u32,
    /// Parents, empty for seeded agents.
    pub parents: Vec<AgentId>,
}

impl Agent {
    /// Whether the agent is still alive.
    pub fn is_alive(&self) -> bool {
        self.state != AgentStatus::Dead
    }

    /// Quantity of an item held.
    pub fn item_count(&self, item: ResourceType) -> u32 {
        self.inventory.get(&item).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// World features
// ---------------------------------------------------------------------------

/// A resource spawn point. Depleted by gathering and refilled by regen;
/// never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceSpawn {
    /// Unique identifier.
    pub id: SpawnId,
    /// Cell the spawn occupies.
    pub position: Position,
    /// What the spawn produces.
    pub resource_type: ResourceType,
    /// Units available right now. Never exceeds `max_amount`.
    pub current_amount: u32,
    /// Capacity.
    pub max_amount: u32,
    /// Units restored per tick.
    pub regen_rate: u32,
}

/// A shelter. Immutable after spawn except for its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Shelter {
    /// Unique identifier.
    pub id: ShelterId,
    /// Cell the shelter occupies.
    pub position: Position,
    /// Whether agents get the sleep bonus here.
    pub can_sleep: bool,
    /// Current owner, if any.
    pub owner: Option<AgentId>,
}

/// A scent trace left at a cell. Strength is derived from its age, never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScentTrace {
    /// Cell the trace marks.
    pub position: Position,
    /// Agent that left it.
    pub agent_id: AgentId,
    /// Tick at which it was left.
    pub tick: u64,
}

/// A claim on a cell by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocationClaim {
    /// The claimed cell.
    pub position: Position,
    /// Agent holding the claim.
    pub claimant: AgentId,
    /// Tick the claim was made.
    pub tick: u64,
}

/// One proposed name for a cell and how often it has been used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocationName {
    /// The named cell.
    pub position: Position,
    /// The proposed name.
    pub name: String,
    /// Number of times the name has been proposed for this cell.
    pub usage_count: u32,
    /// Agent that first proposed it.
    pub proposer: AgentId,
    /// Tick of the first proposal.
    pub first_used_tick: u64,
}

/// A short message broadcast around a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Signal {
    /// Unique identifier.
    pub id: SignalId,
    /// Agent that broadcast it.
    pub emitter: AgentId,
    /// Origin cell.
    pub position: Position,
    /// Message text.
    pub message: String,
    /// Manhattan radius within which the signal is perceived.
    pub radius: u32,
    /// Tick it was broadcast.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// Social graph
// ---------------------------------------------------------------------------

/// What an observer knows about another agent. Each field is independent and
/// may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SharedInfo {
    /// Where the agent was last seen.
    pub last_known_position: Option<Position>,
    /// Opinion of the agent in `[-100, 100]`.
    pub reputation: Option<f64>,
    /// Perceived threat in `[0, 1]`.
    pub danger_level: Option<f64>,
    /// Whether the agent is believed to be open to trade.
    pub trade_interest: Option<bool>,
}

/// An observer's record of another agent.
///
/// `referral_depth` is the shortest chain ever recorded for the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KnowledgeRecord {
    /// The agent holding the knowledge.
    pub observer: AgentId,
    /// The agent known about.
    pub known: AgentId,
    /// How the shortest chain was established.
    pub discovery_type: DiscoveryType,
    /// Who referred the known agent, for referrals.
    pub referred_by: Option<AgentId>,
    /// Zero for direct discovery, hop count otherwise.
    pub referral_depth: u32,
    /// Field-level last-write-wins information.
    pub shared_info: SharedInfo,
    /// Tick of the last update.
    pub information_age: u64,
}

/// Directed trust between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Relationship {
    /// The agent holding the opinion.
    pub from: AgentId,
    /// The agent the opinion is about.
    pub to: AgentId,
    /// Trust in `[-100, 100]`.
    pub trust: f64,
    /// Number of recorded interactions.
    pub interactions: u32,
    /// Tick of the latest interaction.
    pub last_interaction_tick: u64,
}

/// Something an agent remembers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Memory {
    /// Unique identifier.
    pub id: MemoryId,
    /// Agent holding the memory.
    pub owner: AgentId,
    /// Tick the memory was formed.
    pub tick: u64,
    /// Kind of memory.
    pub kind: MemoryKind,
    /// Human-readable content.
    pub content: String,
    /// Importance in `[0, 1]`; low-importance memories are evicted first.
    pub importance: f64,
    /// Emotional colouring.
    pub valence: Valence,
    /// Other agent involved, if any.
    pub related_agent: Option<AgentId>,
}

/// A credential one agent issued about another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Credential {
    /// Unique identifier.
    pub id: CredentialId,
    /// Agent vouching.
    pub issuer: AgentId,
    /// Agent vouched for.
    pub subject: AgentId,
    /// Short title, e.g. "reliable trader".
    pub title: String,
    /// Tick of issue.
    pub issued_tick: u64,
    /// Tick of revocation, if revoked.
    pub revoked_tick: Option<u64>,
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// An employment contract with its escrow.
///
/// `escrow_amount` is what is still held. Payments are drawn from it and can
/// never exceed it; `paid_ticks` never exceeds `ticks_worked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Employment {
    /// Unique identifier.
    pub id: EmploymentId,
    /// Agent paying.
    pub employer: AgentId,
    /// Agent working, once accepted.
    pub worker: Option<AgentId>,
    /// Total salary for the whole contract.
    #[ts(as = "String")]
    pub salary: Decimal,
    /// Ticks of work the contract requires.
    pub ticks_required: u32,
    /// Ticks of work done so far.
    pub ticks_worked: u32,
    /// Ticks already paid for.
    pub paid_ticks: u32,
    /// When the salary is released.
    pub payment_type: PaymentType,
    /// Funds still held in escrow.
    #[ts(as = "String")]
    pub escrow_amount: Decimal,
    /// Lifecycle state.
    pub status: EmploymentStatus,
    /// Cell where the job was posted.
    pub position: Position,
    /// Tick the job was posted.
    pub created_tick: u64,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An immutable record in the append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,
    /// Type tag.
    pub event_type: EventType,
    /// Tick during which the event happened.
    pub tick: u64,
    /// Wall-clock time of emission.
    pub timestamp: DateTime<Utc>,
    /// Agent that caused the event, if any.
    pub agent_id: Option<AgentId>,
    /// Opaque, event-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Create an event stamped with a fresh id and the current time.
    pub fn new(
        event_type: EventType,
        tick: u64,
        agent_id: Option<AgentId>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            tick,
            timestamp: Utc::now(),
            agent_id,
            payload,
        }
    }
}
