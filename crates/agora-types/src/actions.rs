//! Intents, decisions, and the universal action result contract.
//!
//! Decision sources produce a [`Decision`]; the scheduler wraps it into an
//! [`ActionIntent`]; the resolver answers with an [`ActionResult`] that
//! describes the change as deltas. Nothing in this module mutates state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionType, AgentStatus, PaymentType, ResourceType};
use crate::ids::{AgentId, CredentialId, EmploymentId, SpawnId};
use crate::structs::{
    Agent, Credential, Employment, Event, LocationClaim, Memory, Position, SharedInfo, Signal,
};

/// Typed parameters of an action. The variant is the action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionParams {
    /// Head toward `(x, y)`; one step is taken per tick.
    Move {
        /// Destination column.
        x: i32,
        /// Destination row.
        y: i32,
    },
    /// Gather from the spawn at the current cell.
    Gather,
    /// Eat one unit of `item`.
    Eat {
        /// Item to consume.
        item: ResourceType,
    },
    /// Sleep for the tick.
    Sleep,
    /// Work for the tick.
    Work,
    /// Sell `quantity` units of `item` to `target` for `price`.
    Trade {
        /// Buyer.
        target: AgentId,
        /// Item sold.
        item: ResourceType,
        /// Units sold.
        quantity: u32,
        /// Total price paid by the buyer.
        #[ts(as = "String")]
        price: Decimal,
    },
    /// Attack an adjacent agent.
    Harm {
        /// Victim.
        target: AgentId,
    },
    /// Try to take one unit of `item` from an adjacent agent.
    Steal {
        /// Victim.
        target: AgentId,
        /// Item to take.
        item: ResourceType,
    },
    /// Tell `target` something untrue.
    Deceive {
        /// Recipient of the claim.
        target: AgentId,
        /// Claim category, as its wire name.
        claim_type: String,
        /// Claim text.
        claim: String,
    },
    /// Pass on what you know about `subject`.
    ShareInfo {
        /// Recipient.
        target: AgentId,
        /// Agent being described.
        subject: AgentId,
    },
    /// Pass on your opinion of `subject`.
    Gossip {
        /// Recipient.
        target: AgentId,
        /// Agent being discussed.
        subject: AgentId,
        /// Opinion in `[-100, 100]`.
        opinion: i32,
    },
    /// Post a job, funding its escrow from your balance.
    OfferJob {
        /// Total salary.
        #[ts(as = "String")]
        salary: Decimal,
        /// Ticks of work required.
        duration_ticks: u32,
        /// When the salary is released.
        payment_type: PaymentType,
    },
    /// Take a posted job.
    AcceptJob {
        /// Contract to accept.
        employment_id: EmploymentId,
    },
    /// Release owed salary.
    PayWorker {
        /// Contract to settle.
        employment_id: EmploymentId,
    },
    /// Claim the current cell.
    Claim,
    /// Propose a name for the current cell.
    NameLocation {
        /// Proposed name.
        name: String,
    },
    /// Broadcast a message.
    Signal {
        /// Message text.
        message: String,
    },
    /// Produce offspring with an adjacent partner.
    SpawnOffspring {
        /// Co-parent.
        partner: AgentId,
    },
    /// Vouch for another agent.
    IssueCredential {
        /// Agent vouched for.
        subject: AgentId,
        /// Short title.
        title: String,
    },
    /// Withdraw a credential you issued.
    RevokeCredential {
        /// Credential to revoke.
        credential_id: CredentialId,
    },
    /// Do nothing.
    Idle,
}

impl ActionParams {
    /// The action type this variant represents.
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::Move { .. } => ActionType::Move,
            Self::Gather => ActionType::Gather,
            Self::Eat { .. } => ActionType::Eat,
            Self::Sleep => ActionType::Sleep,
            Self::Work => ActionType::Work,
            Self::Trade { .. } => ActionType::Trade,
            Self::Harm { .. } => ActionType::Harm,
            Self::Steal { .. } => ActionType::Steal,
            Self::Deceive { .. } => ActionType::Deceive,
            Self::ShareInfo { .. } => ActionType::ShareInfo,
            Self::Gossip { .. } => ActionType::Gossip,
            Self::OfferJob { .. } => ActionType::OfferJob,
            Self::AcceptJob { .. } => ActionType::AcceptJob,
            Self::PayWorker { .. } => ActionType::PayWorker,
            Self::Claim => ActionType::Claim,
            Self::NameLocation { .. } => ActionType::NameLocation,
            Self::Signal { .. } => ActionType::Signal,
            Self::SpawnOffspring { .. } => ActionType::SpawnOffspring,
            Self::IssueCredential { .. } => ActionType::IssueCredential,
            Self::RevokeCredential { .. } => ActionType::RevokeCredential,
            Self::Idle => ActionType::Idle,
        }
    }

    /// The other agent this action targets, if any.
    pub const fn target(&self) -> Option<AgentId> {
        match self {
            Self::Trade { target, .. }
            | Self::Harm { target }
            | Self::Steal { target, .. }
            | Self::Deceive { target, .. }
            | Self::ShareInfo { target, .. }
            | Self::Gossip { target, .. } => Some(*target),
            Self::SpawnOffspring { partner } => Some(*partner),
            Self::IssueCredential { subject, .. } => Some(*subject),
            _ => None,
        }
    }
}

/// What a decision source returns for one agent and one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Decision {
    /// The chosen action and its parameters.
    pub action: ActionParams,
    /// Free-form explanation, kept for the audit trail.
    pub reasoning: Option<String>,
}

impl Decision {
    /// A decision with no reasoning attached.
    pub const fn new(action: ActionParams) -> Self {
        Self {
            action,
            reasoning: None,
        }
    }

    /// Attach a reasoning string.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// An agent's requested action for the current tick: the only input the
/// resolver accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionIntent {
    /// Acting agent.
    pub agent_id: AgentId,
    /// Requested action.
    pub params: ActionParams,
    /// Tick the intent belongs to.
    pub tick: u64,
    /// When the intent was formed.
    pub timestamp: DateTime<Utc>,
}

impl ActionIntent {
    /// Build an intent stamped with the current time.
    pub fn new(agent_id: AgentId, params: ActionParams, tick: u64) -> Self {
        Self {
            agent_id,
            params,
            tick,
            timestamp: Utc::now(),
        }
    }

    /// The requested action type.
    pub const fn action_type(&self) -> ActionType {
        self.params.action_type()
    }
}

/// Partial change to one agent.
///
/// Vitals, balance, and inventory are relative; position and state are
/// absolute replacements. The scheduler clamps vitals into range when it
/// applies the delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentDelta {
    /// Change in satiety.
    pub hunger: f64,
    /// Change in energy.
    pub energy: f64,
    /// Change in health.
    pub health: f64,
    /// Change in balance.
    #[ts(as = "String")]
    pub balance: Decimal,
    /// New position.
    pub position: Option<Position>,
    /// New behavioral state.
    pub state: Option<AgentStatus>,
    /// Change in inventory counts.
    pub inventory: BTreeMap<ResourceType, i64>,
}

impl AgentDelta {
    /// Whether applying this delta would change nothing.
    pub fn is_empty(&self) -> bool {
        self.hunger.abs() < f64::EPSILON
            && self.energy.abs() < f64::EPSILON
            && self.health.abs() < f64::EPSILON
            && self.balance.is_zero()
            && self.position.is_none()
            && self.state.is_none()
            && self.inventory.values().all(|v| *v == 0)
    }

    /// Add `amount` of `item` to the inventory change.
    pub fn add_item(&mut self, item: ResourceType, amount: i64) {
        let entry = self.inventory.entry(item).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}

/// A change to some entity other than the acting agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "effect", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WorldEffect {
    /// Apply a delta to another agent.
    AdjustAgent {
        /// Affected agent.
        agent_id: AgentId,
        /// Change to apply.
        delta: AgentDelta,
    },
    /// Add (positive) or remove (negative) units from a spawn.
    AdjustSpawn {
        /// Affected spawn.
        spawn_id: SpawnId,
        /// Signed change.
        amount: i64,
    },
    /// Leave a scent trace.
    LeaveScent {
        /// Marked cell.
        position: Position,
        /// Agent leaving the trace.
        agent_id: AgentId,
    },
    /// Store a memory.
    RecordMemory {
        /// The memory.
        memory: Memory,
    },
    /// Shift directed trust.
    AdjustTrust {
        /// Agent holding the opinion.
        from: AgentId,
        /// Agent the opinion is about.
        to: AgentId,
        /// Signed change.
        amount: f64,
    },
    /// Merge knowledge into the social graph.
    RecordKnowledge {
        /// Agent learning.
        observer: AgentId,
        /// Agent learned about.
        known: AgentId,
        /// Referrer and the referrer's own depth, for referrals.
        referral: Option<Referral>,
        /// Information learned.
        info: SharedInfo,
    },
    /// Propose a name for a cell.
    ProposeName {
        /// Named cell.
        position: Position,
        /// Proposed name.
        name: String,
        /// Proposing agent.
        proposer: AgentId,
    },
    /// Claim a cell.
    ClaimLocation {
        /// The claim.
        claim: LocationClaim,
    },
    /// Insert or replace an employment record.
    UpsertEmployment {
        /// The record.
        employment: Employment,
    },
    /// Add a newborn agent.
    AddAgent {
        /// The new agent.
        agent: Box<Agent>,
    },
    /// Broadcast a signal.
    EmitSignal {
        /// The signal.
        signal: Signal,
    },
    /// Record a credential.
    IssueCredential {
        /// The credential.
        credential: Credential,
    },
    /// Mark a credential revoked.
    RevokeCredential {
        /// Credential revoked.
        credential_id: CredentialId,
        /// Tick of revocation.
        tick: u64,
    },
}

/// Referral metadata attached to a knowledge write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Referral {
    /// Agent passing the knowledge on.
    pub referrer: AgentId,
    /// The referrer's own depth for the known agent.
    pub referrer_depth: u32,
}

/// The universal output of every action handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionResult {
    /// Whether the action took effect.
    pub success: bool,
    /// Change to the acting agent.
    pub delta: Option<AgentDelta>,
    /// Changes to everything else.
    pub effects: Vec<WorldEffect>,
    /// User-facing error for failed actions.
    pub error: Option<String>,
    /// Events needed to reconstruct the effect.
    pub events: Vec<Event>,
}

impl ActionResult {
    /// A successful result.
    pub const fn succeeded(delta: AgentDelta, effects: Vec<WorldEffect>, events: Vec<Event>) -> Self {
        Self {
            success: true,
            delta: Some(delta),
            effects,
            error: None,
            events,
        }
    }

    /// A failed result carrying a user-facing error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            delta: None,
            effects: Vec::new(),
            error: Some(error.into()),
            events: Vec::new(),
        }
    }
}
