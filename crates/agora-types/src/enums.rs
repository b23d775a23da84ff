//! Enumeration types shared across the workspace.
//!
//! Every enum serializes in `snake_case` so that event payloads, decision
//! responses, and persisted rows all use the same vocabulary.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A resource produced by spawn points and held in agent inventories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ResourceType {
    /// Edible food; restores satiety.
    Food,
    /// Drinking water; restores a little satiety and energy.
    Water,
    /// Timber, a trade good.
    Wood,
    /// Stone, a trade good.
    Stone,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [Self; 4] = [Self::Food, Self::Water, Self::Wood, Self::Stone];

    /// Whether an agent can eat this resource.
    pub const fn is_consumable(self) -> bool {
        matches!(self, Self::Food | Self::Water)
    }
}

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

/// Behavioral state of an agent. `Dead` is terminal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentStatus {
    /// Not doing anything in particular.
    #[default]
    Idle,
    /// Moved during the last tick.
    Walking,
    /// Worked during the last tick.
    Working,
    /// Slept during the last tick.
    Sleeping,
    /// Health reached zero. Terminal.
    Dead,
}

/// A fixed personality trait, assigned at most once per agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Personality {
    /// Prefers sharing and employment.
    Cooperative,
    /// Prefers harm and theft.
    Aggressive,
    /// Avoids risk, rests early.
    Cautious,
    /// Explores and names places.
    Curious,
    /// Hoards resources and currency.
    Greedy,
}

impl Personality {
    /// Every personality trait, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Cooperative,
        Self::Aggressive,
        Self::Cautious,
        Self::Curious,
        Self::Greedy,
    ];
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The closed catalogue of actions an agent may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionType {
    /// Step one cell toward a destination.
    Move,
    /// Collect from the resource spawn at the current cell.
    Gather,
    /// Consume an item from inventory.
    Eat,
    /// Recover energy, more so inside a shelter.
    Sleep,
    /// Earn a wage, or progress an employment contract.
    Work,
    /// Sell items to a nearby agent.
    Trade,
    /// Damage an adjacent agent.
    Harm,
    /// Take an item from an adjacent agent.
    Steal,
    /// Plant a false claim in a nearby agent's memory.
    Deceive,
    /// Tell a nearby agent about a third agent.
    ShareInfo,
    /// Tell a nearby agent what you think of a third agent.
    Gossip,
    /// Post a job backed by escrow.
    OfferJob,
    /// Take a posted job.
    AcceptJob,
    /// Release owed salary from escrow.
    PayWorker,
    /// Claim the current cell.
    Claim,
    /// Propose a name for the current cell.
    NameLocation,
    /// Broadcast a short message around the current cell.
    Signal,
    /// Produce a child with an adjacent partner.
    SpawnOffspring,
    /// Vouch for another agent.
    IssueCredential,
    /// Withdraw a previously issued credential.
    RevokeCredential,
    /// Do nothing.
    Idle,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::Move,
        Self::Gather,
        Self::Eat,
        Self::Sleep,
        Self::Work,
        Self::Trade,
        Self::Harm,
        Self::Steal,
        Self::Deceive,
        Self::ShareInfo,
        Self::Gossip,
        Self::OfferJob,
        Self::AcceptJob,
        Self::PayWorker,
        Self::Claim,
        Self::NameLocation,
        Self::Signal,
        Self::SpawnOffspring,
        Self::IssueCredential,
        Self::RevokeCredential,
        Self::Idle,
    ];

    /// Wire name of the action (`snake_case`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Gather => "gather",
            Self::Eat => "eat",
            Self::Sleep => "sleep",
            Self::Work => "work",
            Self::Trade => "trade",
            Self::Harm => "harm",
            Self::Steal => "steal",
            Self::Deceive => "deceive",
            Self::ShareInfo => "share_info",
            Self::Gossip => "gossip",
            Self::OfferJob => "offer_job",
            Self::AcceptJob => "accept_job",
            Self::PayWorker => "pay_worker",
            Self::Claim => "claim",
            Self::NameLocation => "name_location",
            Self::Signal => "signal",
            Self::SpawnOffspring => "spawn_offspring",
            Self::IssueCredential => "issue_credential",
            Self::RevokeCredential => "revoke_credential",
            Self::Idle => "idle",
        }
    }

    /// Whether the action involves another agent.
    pub const fn is_social(self) -> bool {
        matches!(
            self,
            Self::Trade
                | Self::Harm
                | Self::Steal
                | Self::Deceive
                | Self::ShareInfo
                | Self::Gossip
                | Self::OfferJob
                | Self::AcceptJob
                | Self::PayWorker
                | Self::SpawnOffspring
                | Self::IssueCredential
                | Self::RevokeCredential
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a deceptive claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClaimType {
    /// Lies about where a resource is.
    ResourceLocation,
    /// Lies about another agent.
    AgentReputation,
    /// Invents a danger.
    DangerWarning,
    /// Invents a trade deal.
    TradeOpportunity,
    /// Lies about where a shelter is.
    ShelterLocation,
}

impl ClaimType {
    /// Wire name of the claim type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceLocation => "resource_location",
            Self::AgentReputation => "agent_reputation",
            Self::DangerWarning => "danger_warning",
            Self::TradeOpportunity => "trade_opportunity",
            Self::ShelterLocation => "shelter_location",
        }
    }
}

impl FromStr for ClaimType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resource_location" => Ok(Self::ResourceLocation),
            "agent_reputation" => Ok(Self::AgentReputation),
            "danger_warning" => Ok(Self::DangerWarning),
            "trade_opportunity" => Ok(Self::TradeOpportunity),
            "shelter_location" => Ok(Self::ShelterLocation),
            other => Err(format!("unknown claim type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Social graph
// ---------------------------------------------------------------------------

/// How an observer came to know about another agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DiscoveryType {
    /// Met in person.
    Direct,
    /// Heard about from another agent.
    Referral,
}

/// Kind of a stored memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MemoryKind {
    /// Something the agent saw.
    Observation,
    /// Something done to or with the agent.
    Interaction,
    /// A claim told to the agent by someone else.
    ReceivedClaim,
    /// A note the agent keeps about its own conduct.
    SelfRecord,
}

/// Emotional colouring of a memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Valence {
    /// Good experience.
    Positive,
    /// Neither good nor bad.
    #[default]
    Neutral,
    /// Bad experience.
    Negative,
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// When an employer's escrow is released to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PaymentType {
    /// Full salary paid when the job is accepted.
    Upfront,
    /// Full salary paid once all required ticks are worked.
    OnCompletion,
    /// A share of the salary paid for every worked tick.
    PerTick,
}

/// Lifecycle of an employment contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EmploymentStatus {
    /// Posted, waiting for a worker.
    Offered,
    /// Accepted and in progress.
    Active,
    /// All ticks worked and salary settled.
    Completed,
    /// Abandoned; remaining escrow returned to the employer.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------------

/// Derived freshness of a scent trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ScentStrength {
    /// Younger than 30% of the scent duration.
    Strong,
    /// Between 30% and 70% of the scent duration.
    Weak,
    /// Older than 70% of the duration, or of unknown age.
    Faint,
}

/// Eight-way compass heading, plus `Here` for the zero vector.
///
/// North is toward decreasing `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CompassDirection {
    /// Same cell.
    Here,
    /// Toward decreasing `y`.
    North,
    /// North-east.
    NorthEast,
    /// Toward increasing `x`.
    East,
    /// South-east.
    SouthEast,
    /// Toward increasing `y`.
    South,
    /// South-west.
    SouthWest,
    /// Toward decreasing `x`.
    West,
    /// North-west.
    NorthWest,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Type tag of an event in the append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventType {
    /// An agent took one step.
    AgentMoved,
    /// An agent collected from a spawn.
    ResourceGathered,
    /// An agent ate an item.
    AgentAte,
    /// An agent slept.
    AgentSlept,
    /// An agent worked.
    AgentWorked,
    /// Items changed hands for currency.
    TradeCompleted,
    /// An agent damaged another.
    AgentHarmed,
    /// A theft attempt, successful or not.
    TheftAttempted,
    /// A claim was planted. Carries a digest, never the claim text.
    AgentDeceived,
    /// Knowledge about a third agent was passed on.
    InfoShared,
    /// An opinion about a third agent was passed on.
    GossipSpread,
    /// A job was posted.
    JobOffered,
    /// A job was taken.
    JobAccepted,
    /// Salary was released from escrow.
    WorkerPaid,
    /// A cell was claimed.
    LocationClaimed,
    /// A name was proposed for a cell.
    LocationNamed,
    /// A signal was broadcast.
    SignalEmitted,
    /// A child agent was born.
    OffspringSpawned,
    /// A credential was issued.
    CredentialIssued,
    /// A credential was revoked.
    CredentialRevoked,
    /// An agent did nothing.
    AgentIdled,
    /// Two agents met in person.
    AgentDiscovered,
    /// An intent was rejected, or resolution failed.
    ActionFailed,
    /// The primary decision source failed and a fallback was used.
    DecisionFallback,
    /// An agent's health reached zero.
    AgentDied,
    /// A tick committed.
    TickCompleted,
}

impl EventType {
    /// Wire name of the event type (`snake_case`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgentMoved => "agent_moved",
            Self::ResourceGathered => "resource_gathered",
            Self::AgentAte => "agent_ate",
            Self::AgentSlept => "agent_slept",
            Self::AgentWorked => "agent_worked",
            Self::TradeCompleted => "trade_completed",
            Self::AgentHarmed => "agent_harmed",
            Self::TheftAttempted => "theft_attempted",
            Self::AgentDeceived => "agent_deceived",
            Self::InfoShared => "info_shared",
            Self::GossipSpread => "gossip_spread",
            Self::JobOffered => "job_offered",
            Self::JobAccepted => "job_accepted",
            Self::WorkerPaid => "worker_paid",
            Self::LocationClaimed => "location_claimed",
            Self::LocationNamed => "location_named",
            Self::SignalEmitted => "signal_emitted",
            Self::OffspringSpawned => "offspring_spawned",
            Self::CredentialIssued => "credential_issued",
            Self::CredentialRevoked => "credential_revoked",
            Self::AgentIdled => "agent_idled",
            Self::AgentDiscovered => "agent_discovered",
            Self::ActionFailed => "action_failed",
            Self::DecisionFallback => "decision_fallback",
            Self::AgentDied => "agent_died",
            Self::TickCompleted => "tick_completed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
