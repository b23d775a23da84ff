//! The mutable world a tick operates on.
//!
//! The scheduler keeps one authoritative [`WorldState`] and clones it twice
//! per tick: a read-only snapshot that handlers resolve against, and a
//! working copy that results are applied to. Results are applied one at a
//! time in ascending agent-id order through [`WorldState::apply_result`].
//!
//! Handlers never see each other's effects, so two of them may both spend
//! the same stock. Application re-checks every contested quantity against
//! the working copy and rejects the whole result when one no longer holds.
//! Because results are applied in agent-id order, the lower id always wins.

use std::collections::BTreeMap;

use agora_types::{
    ActionIntent, ActionResult, ActionType, Agent, AgentDelta, AgentId, AgentStatus, Credential,
    CredentialId, Employment, EmploymentId, EmploymentStatus, LastActionResult, LocationClaim,
    Position, ResourceSpawn, ResourceType, ScentTrace, Shelter, ShelterId, Signal, SpawnId,
    WorldEffect,
};
use agora_world::{NameRegistry, resource};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{ActionError, AgentError};
use crate::inventory;
use crate::knowledge::KnowledgeGraph;
use crate::memory::MemoryStore;
use crate::relationships::RelationshipGraph;
use crate::vitals::clamp_vital;

/// Complete simulation state at a tick boundary.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    /// Tick currently being processed, or the last committed one.
    pub tick: u64,
    /// Side length of the square grid.
    pub world_size: i32,
    /// Every agent ever born, dead ones included.
    pub agents: BTreeMap<AgentId, Agent>,
    /// Resource spawns.
    pub spawns: BTreeMap<SpawnId, ResourceSpawn>,
    /// Shelters.
    pub shelters: BTreeMap<ShelterId, Shelter>,
    /// Agent memories.
    pub memories: MemoryStore,
    /// Directed trust.
    pub relationships: RelationshipGraph,
    /// Who knows about whom.
    pub knowledge: KnowledgeGraph,
    /// Location names.
    pub names: NameRegistry,
    /// Cell claims.
    pub claims: BTreeMap<Position, LocationClaim>,
    /// Employment contracts.
    pub employments: BTreeMap<EmploymentId, Employment>,
    /// Live signals.
    pub signals: Vec<Signal>,
    /// Credentials.
    pub credentials: BTreeMap<CredentialId, Credential>,
    /// Each agent's most recent action outcome.
    pub last_results: BTreeMap<AgentId, LastActionResult>,
}

/// Output of applying a result that lives outside the world state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Scent traces to write through the scent store.
    pub scents: Vec<ScentTrace>,
}

impl WorldState {
    /// An empty world of the given size.
    pub fn new(world_size: i32) -> Self {
        Self {
            world_size,
            ..Self::default()
        }
    }

    /// Look up an agent.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Look up an agent that must exist.
    pub fn require_agent(&self, id: AgentId) -> Result<&Agent, AgentError> {
        self.agents.get(&id).ok_or(AgentError::AgentNotFound(id))
    }

    /// Agents that are not dead, in id order.
    pub fn living_agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.is_alive())
    }

    /// Number of living agents.
    pub fn living_count(&self) -> usize {
        self.living_agents().count()
    }

    /// The spawn on a cell, if any.
    pub fn spawn_at(&self, position: Position) -> Option<&ResourceSpawn> {
        self.spawns.values().find(|s| s.position == position)
    }

    /// The shelter on a cell, if any.
    pub fn shelter_at(&self, position: Position) -> Option<&Shelter> {
        self.shelters.values().find(|s| s.position == position)
    }

    /// The claim on a cell, if any.
    pub fn claim_at(&self, position: Position) -> Option<&LocationClaim> {
        self.claims.get(&position)
    }

    /// The active contract in which `worker` is employed, if any.
    pub fn active_job_of(&self, worker: AgentId) -> Option<&Employment> {
        self.employments
            .values()
            .find(|e| e.status == EmploymentStatus::Active && e.worker == Some(worker))
    }

    /// The active contract of `worker` that still has ticks left to work.
    ///
    /// A fully worked contract stays active until the employer settles it,
    /// but no longer takes work.
    pub fn job_with_work_left(&self, worker: AgentId) -> Option<&Employment> {
        self.active_job_of(worker)
            .filter(|e| e.ticks_worked < e.ticks_required)
    }

    /// Insert or replace an agent.
    pub fn insert_agent(&mut self, agent: Agent) {
        self.agents.insert(agent.id, agent);
    }

    /// Apply one resolved result to this working copy.
    ///
    /// `snapshot` is the tick-start state the handler resolved against. The
    /// result is applied entirely or not at all; on conflict nothing changes
    /// and the caller turns the error into a failed result.
    pub fn apply_result(
        &mut self,
        intent: &ActionIntent,
        result: &ActionResult,
        snapshot: &Self,
        memory_capacity: usize,
    ) -> Result<Applied, ActionError> {
        let action = intent.action_type();
        if !result.success {
            self.record_outcome(intent.agent_id, action, false, result.error.clone());
            return Ok(Applied::default());
        }

        self.check_result(intent.agent_id, result, snapshot)?;

        if let Some(delta) = &result.delta {
            if let Some(agent) = self.agents.get_mut(&intent.agent_id) {
                apply_delta(agent, delta);
                agent.last_action = Some(action);
            }
        }
        let mut applied = Applied::default();
        for effect in &result.effects {
            self.apply_effect(effect, memory_capacity, &mut applied);
        }
        self.record_outcome(intent.agent_id, action, true, None);
        Ok(applied)
    }

    /// Remember how an agent's action turned out, for its next observation.
    pub fn record_outcome(
        &mut self,
        agent_id: AgentId,
        action: ActionType,
        success: bool,
        error: Option<String>,
    ) {
        self.last_results.insert(
            agent_id,
            LastActionResult {
                action,
                success,
                error,
            },
        );
    }

    fn check_result(
        &self,
        actor: AgentId,
        result: &ActionResult,
        snapshot: &Self,
    ) -> Result<(), ActionError> {
        let mut agent_changes: BTreeMap<AgentId, PendingChange> = BTreeMap::new();
        if let Some(delta) = &result.delta {
            agent_changes.entry(actor).or_default().add(delta);
        }
        let mut spawn_changes: BTreeMap<SpawnId, i64> = BTreeMap::new();

        for effect in &result.effects {
            match effect {
                WorldEffect::AdjustAgent { agent_id, delta } => {
                    agent_changes.entry(*agent_id).or_default().add(delta);
                }
                WorldEffect::AdjustSpawn { spawn_id, amount } => {
                    let total = spawn_changes.entry(*spawn_id).or_insert(0);
                    *total = total.saturating_add(*amount);
                }
                WorldEffect::ClaimLocation { claim } => self.check_claim(claim)?,
                WorldEffect::UpsertEmployment { employment } => {
                    if self.employments.get(&employment.id)
                        != snapshot.employments.get(&employment.id)
                    {
                        return Err(ActionError::Conflict(
                            "the contract changed earlier this tick".to_owned(),
                        ));
                    }
                }
                WorldEffect::RevokeCredential { credential_id, .. } => {
                    let live = self
                        .credentials
                        .get(credential_id)
                        .is_some_and(|c| c.revoked_tick.is_none());
                    if !live {
                        return Err(ActionError::Conflict(
                            "the credential was revoked earlier this tick".to_owned(),
                        ));
                    }
                }
                _ => {}
            }
        }

        for (agent_id, change) in &agent_changes {
            let agent = self.agents.get(agent_id).ok_or_else(|| {
                ActionError::Conflict(format!("agent {agent_id} no longer exists"))
            })?;
            let balance_ok = agent
                .balance
                .checked_add(change.balance)
                .is_some_and(|b| b >= Decimal::ZERO);
            if !balance_ok {
                return Err(ActionError::Conflict(format!(
                    "{} can no longer cover the payment",
                    agent.name
                )));
            }
            if !inventory::can_apply(&agent.inventory, &change.items) {
                return Err(ActionError::Conflict(format!(
                    "{} no longer holds the items",
                    agent.name
                )));
            }
        }

        for (spawn_id, change) in &spawn_changes {
            let spawn = self.spawns.get(spawn_id).ok_or_else(|| {
                ActionError::Conflict("the resource spawn no longer exists".to_owned())
            })?;
            if i64::from(spawn.current_amount).saturating_add(*change) < 0 {
                return Err(ActionError::Conflict(
                    "the resource was depleted earlier this tick".to_owned(),
                ));
            }
        }
        Ok(())
    }

    fn check_claim(&self, claim: &LocationClaim) -> Result<(), ActionError> {
        let Some(existing) = self.claims.get(&claim.position) else {
            return Ok(());
        };
        let holder_alive = self
            .agents
            .get(&existing.claimant)
            .is_some_and(Agent::is_alive);
        if existing.claimant != claim.claimant && holder_alive {
            return Err(ActionError::Conflict(format!(
                "{} was claimed earlier this tick",
                claim.position
            )));
        }
        Ok(())
    }

    fn apply_effect(&mut self, effect: &WorldEffect, memory_capacity: usize, applied: &mut Applied) {
        match effect {
            WorldEffect::AdjustAgent { agent_id, delta } => {
                if let Some(agent) = self.agents.get_mut(agent_id) {
                    apply_delta(agent, delta);
                }
            }
            WorldEffect::AdjustSpawn { spawn_id, amount } => {
                if let Some(spawn) = self.spawns.get_mut(spawn_id) {
                    resource::adjust(spawn, *amount);
                }
            }
            WorldEffect::LeaveScent { position, agent_id } => applied.scents.push(ScentTrace {
                position: *position,
                agent_id: *agent_id,
                tick: self.tick,
            }),
            WorldEffect::RecordMemory { memory } => {
                self.memories.record(memory.clone(), memory_capacity);
            }
            WorldEffect::AdjustTrust { from, to, amount } => {
                self.relationships.adjust(*from, *to, *amount, self.tick);
            }
            WorldEffect::RecordKnowledge {
                observer,
                known,
                referral,
                info,
            } => {
                match referral {
                    Some(r) => self.knowledge.record_referral(
                        *observer,
                        *known,
                        r.referrer,
                        r.referrer_depth,
                        *info,
                        self.tick,
                    ),
                    None => {
                        self.knowledge
                            .record_direct_discovery(*observer, *known, *info, self.tick)
                    }
                };
            }
            WorldEffect::ProposeName {
                position,
                name,
                proposer,
            } => {
                self.names.propose(*position, name, *proposer, self.tick);
            }
            WorldEffect::ClaimLocation { claim } => {
                self.claims.insert(claim.position, claim.clone());
            }
            WorldEffect::UpsertEmployment { employment } => {
                self.employments.insert(employment.id, employment.clone());
            }
            WorldEffect::AddAgent { agent } => {
                self.agents.insert(agent.id, agent.as_ref().clone());
            }
            WorldEffect::EmitSignal { signal } => self.signals.push(signal.clone()),
            WorldEffect::IssueCredential { credential } => {
                self.credentials.insert(credential.id, credential.clone());
            }
            WorldEffect::RevokeCredential {
                credential_id,
                tick,
            } => {
                if let Some(credential) = self.credentials.get_mut(credential_id) {
                    credential.revoked_tick = Some(*tick);
                }
            }
        }
    }
}

/// Balance and inventory movement summed over every delta hitting one agent.
#[derive(Debug, Default)]
struct PendingChange {
    balance: Decimal,
    items: BTreeMap<ResourceType, i64>,
}

impl PendingChange {
    fn add(&mut self, delta: &AgentDelta) {
        self.balance = self.balance.saturating_add(delta.balance);
        for (item, amount) in &delta.inventory {
            let total = self.items.entry(*item).or_insert(0);
            *total = total.saturating_add(*amount);
        }
    }
}

/// Apply a delta to an agent. Dead agents never leave the dead state.
pub fn apply_delta(agent: &mut Agent, delta: &AgentDelta) {
    agent.hunger = clamp_vital(agent.hunger + delta.hunger);
    agent.energy = clamp_vital(agent.energy + delta.energy);
    agent.health = clamp_vital(agent.health + delta.health);
    agent.balance = agent
        .balance
        .saturating_add(delta.balance)
        .max(Decimal::ZERO);
    if let Some(position) = delta.position {
        agent.position = position;
    }
    if let Some(state) = delta.state {
        if agent.state != AgentStatus::Dead {
            agent.state = state;
        }
    }
    if let Err(item) = inventory::apply_changes(&mut agent.inventory, &delta.inventory) {
        warn!(agent_id = %agent.id, ?item, "Inventory change skipped, count would go negative");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use agora_types::{ActionParams, EmploymentId, PaymentType, Referral, SharedInfo};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::test_support::{agent_at, world_with};

    fn gather_result(spawn_id: SpawnId, take: u32) -> ActionResult {
        let mut delta = AgentDelta::default();
        delta.add_item(ResourceType::Food, i64::from(take));
        ActionResult::succeeded(
            delta,
            vec![WorldEffect::AdjustSpawn {
                spawn_id,
                amount: -i64::from(take),
            }],
            Vec::new(),
        )
    }

    fn spawn(amount: u32) -> ResourceSpawn {
        ResourceSpawn {
            id: SpawnId::from_random_bytes([9; 16]),
            position: Position::new(2, 2),
            resource_type: ResourceType::Food,
            current_amount: amount,
            max_amount: 20,
            regen_rate: 1,
        }
    }

    #[test]
    fn lower_agent_id_wins_contested_stock() {
        let first = agent_at(1, 2, 2);
        let second = agent_at(2, 2, 2);
        let mut world = world_with(vec![first.clone(), second.clone()]);
        let s = spawn(2);
        world.spawns.insert(s.id, s.clone());
        let snapshot = world.clone();

        let a = ActionIntent::new(first.id, ActionParams::Gather, 1);
        let b = ActionIntent::new(second.id, ActionParams::Gather, 1);
        world
            .apply_result(&a, &gather_result(s.id, 2), &snapshot, 10)
            .unwrap();
        let err = world
            .apply_result(&b, &gather_result(s.id, 2), &snapshot, 10)
            .unwrap_err();

        assert!(matches!(err, ActionError::Conflict(_)));
        assert_eq!(world.spawns.get(&s.id).unwrap().current_amount, 0);
        assert_eq!(world.agent(first.id).unwrap().item_count(ResourceType::Food), 2);
        assert_eq!(world.agent(second.id).unwrap().item_count(ResourceType::Food), 0);
    }

    #[test]
    fn rejected_result_changes_nothing() {
        let poor = agent_at(1, 0, 0);
        let mut world = world_with(vec![poor.clone()]);
        let snapshot = world.clone();
        let delta = AgentDelta {
            energy: -5.0,
            balance: dec!(-3),
            ..AgentDelta::default()
        };
        let intent = ActionIntent::new(poor.id, ActionParams::Work, 1);
        let result = ActionResult::succeeded(delta, Vec::new(), Vec::new());

        assert!(world.apply_result(&intent, &result, &snapshot, 10).is_err());
        let after = world.agent(poor.id).unwrap();
        assert_eq!(after.energy, poor.energy);
        assert_eq!(after.last_action, None);
    }

    #[test]
    fn success_sets_last_action_and_outcome() {
        let a = agent_at(1, 0, 0);
        let mut world = world_with(vec![a.clone()]);
        let snapshot = world.clone();
        let intent = ActionIntent::new(a.id, ActionParams::Idle, 1);
        let result = ActionResult::succeeded(AgentDelta::default(), Vec::new(), Vec::new());
        world.apply_result(&intent, &result, &snapshot, 10).unwrap();

        assert_eq!(world.agent(a.id).unwrap().last_action, Some(ActionType::Idle));
        assert!(world.last_results.get(&a.id).unwrap().success);
    }

    #[test]
    fn failed_result_only_records_outcome() {
        let a = agent_at(1, 0, 0);
        let mut world = world_with(vec![a.clone()]);
        let snapshot = world.clone();
        let intent = ActionIntent::new(a.id, ActionParams::Gather, 1);
        world
            .apply_result(&intent, &ActionResult::failed("nope"), &snapshot, 10)
            .unwrap();
        let outcome = world.last_results.get(&a.id).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("nope"));
        assert_eq!(world.agent(a.id).unwrap().last_action, None);
    }

    #[test]
    fn contract_changed_since_snapshot_conflicts() {
        let employer = agent_at(1, 0, 0);
        let worker = agent_at(2, 0, 0);
        let mut world = world_with(vec![employer.clone(), worker.clone()]);
        let offer = crate::employment::open_offer(
            EmploymentId::from_random_bytes([3; 16]),
            employer.id,
            dec!(5),
            2,
            PaymentType::PerTick,
            Position::new(0, 0),
            0,
        )
        .unwrap();
        world.employments.insert(offer.id, offer.clone());
        let snapshot = world.clone();

        let mut taken = offer.clone();
        taken.worker = Some(worker.id);
        taken.status = EmploymentStatus::Active;
        world.employments.insert(taken.id, taken.clone());

        let intent = ActionIntent::new(
            worker.id,
            ActionParams::AcceptJob {
                employment_id: offer.id,
            },
            1,
        );
        let result = ActionResult::succeeded(
            AgentDelta::default(),
            vec![WorldEffect::UpsertEmployment { employment: taken }],
            Vec::new(),
        );
        assert!(matches!(
            world.apply_result(&intent, &result, &snapshot, 10),
            Err(ActionError::Conflict(_))
        ));
    }

    #[test]
    fn effects_reach_the_social_graph_and_scent_output() {
        let a = agent_at(1, 0, 0);
        let b = agent_at(2, 1, 0);
        let mut world = world_with(vec![a.clone(), b.clone()]);
        world.tick = 7;
        let snapshot = world.clone();
        let intent = ActionIntent::new(a.id, ActionParams::Move { x: 1, y: 0 }, 7);
        let result = ActionResult::succeeded(
            AgentDelta::default(),
            vec![
                WorldEffect::LeaveScent {
                    position: Position::new(0, 0),
                    agent_id: a.id,
                },
                WorldEffect::RecordKnowledge {
                    observer: b.id,
                    known: a.id,
                    referral: Some(Referral {
                        referrer: a.id,
                        referrer_depth: 0,
                    }),
                    info: SharedInfo::default(),
                },
                WorldEffect::AdjustTrust {
                    from: b.id,
                    to: a.id,
                    amount: 5.0,
                },
            ],
            Vec::new(),
        );
        let applied = world.apply_result(&intent, &result, &snapshot, 10).unwrap();

        assert_eq!(applied.scents.len(), 1);
        assert_eq!(applied.scents.first().unwrap().tick, 7);
        assert_eq!(world.knowledge.get(b.id, a.id).unwrap().referral_depth, 1);
        assert_eq!(world.relationships.trust(b.id, a.id), 5.0);
    }

    #[test]
    fn dead_agents_stay_dead() {
        let mut a = agent_at(1, 0, 0);
        a.state = AgentStatus::Dead;
        a.health = 0.0;
        apply_delta(
            &mut a,
            &AgentDelta {
                health: 50.0,
                state: Some(AgentStatus::Idle),
                ..AgentDelta::default()
            },
        );
        assert_eq!(a.state, AgentStatus::Dead);
    }
}
