//! Action resolution: one handler per action type behind a lookup table.
//!
//! Every handler follows the same contract. It reads the acting agent and
//! the tick-start world, validates the intent, computes the cost, and
//! returns the agent's delta, the effects on everything else, and the events
//! describing what happened. Handlers never mutate anything; the scheduler
//! applies their output to the working copy.
//!
//! # Submodules
//!
//! - [`costs`] -- Base costs and the penalty formula.
//! - [`movement`] -- `move`.
//! - [`survival`] -- `gather`, `eat`, `sleep`, `work`, `idle`.
//! - [`exchange`] -- `trade`, `offer_job`, `accept_job`, `pay_worker`.
//! - [`combat`] -- `harm`, `steal`.
//! - [`deception`] -- `deceive`.
//! - [`social`] -- `share_info`, `gossip`.
//! - [`territory`] -- `claim`, `name_location`, `signal`.
//! - [`reproduction`] -- `spawn_offspring`.
//! - [`credentials`] -- `issue_credential`, `revoke_credential`.

pub mod combat;
pub mod costs;
pub mod credentials;
pub mod deception;
pub mod exchange;
pub mod movement;
pub mod reproduction;
pub mod social;
pub mod survival;
pub mod territory;

use std::collections::BTreeMap;

use agora_types::{
    ActionIntent, ActionResult, ActionType, Agent, AgentDelta, AgentId, Event, EventType, Memory,
    MemoryId, MemoryKind, Valence, WorldEffect,
};
use agora_world::manhattan_distance;
use rand::{Rng, RngCore};
use serde_json::json;
use tracing::debug;

use crate::config::ActionConfig;
use crate::error::ActionError;
use crate::world_state::WorldState;

use self::costs::Cost;

/// Read-only inputs shared by every handler during one resolution.
pub struct ResolutionContext<'a> {
    /// Tick being resolved.
    pub tick: u64,
    /// Tick-start world.
    pub world: &'a WorldState,
    /// Tunables.
    pub config: &'a ActionConfig,
    /// Per-agent stream for this tick.
    pub rng: &'a mut dyn RngCore,
}

impl<'a> ResolutionContext<'a> {
    /// Fresh identifier bytes drawn from the agent's stream, so new entities
    /// are reproducible under a fixed seed.
    pub fn id_bytes(&mut self) -> [u8; 16] {
        self.rng.random()
    }

    /// The target of a directed action, which must be another living agent.
    pub fn living_target(&self, actor: &Agent, target: AgentId) -> Result<&'a Agent, ActionError> {
        let world: &'a WorldState = self.world;
        if target == actor.id {
            return Err(ActionError::CannotTargetSelf);
        }
        let agent = world
            .agent(target)
            .ok_or(ActionError::TargetNotFound(target))?;
        if !agent.is_alive() {
            return Err(ActionError::TargetDead(target));
        }
        Ok(agent)
    }

    /// A memory owned by `owner`, stamped with this tick.
    pub fn memory(
        &mut self,
        owner: AgentId,
        kind: MemoryKind,
        content: String,
        importance: f64,
        valence: Valence,
        related_agent: Option<AgentId>,
    ) -> Memory {
        Memory {
            id: MemoryId::from_random_bytes(self.id_bytes()),
            owner,
            tick: self.tick,
            kind,
            content,
            importance: importance.clamp(0.0, 1.0),
            valence,
            related_agent,
        }
    }

    /// An event attributed to `agent`.
    pub fn event(&self, event_type: EventType, agent: AgentId, payload: serde_json::Value) -> Event {
        Event::new(event_type, self.tick, Some(agent), payload)
    }
}

/// Fail unless `target` is within `range` cells of `actor`.
pub fn ensure_in_range(actor: &Agent, target: &Agent, range: u32) -> Result<u32, ActionError> {
    let distance = manhattan_distance(actor.position, target.position);
    if distance > range {
        return Err(ActionError::OutOfRange { distance, range });
    }
    Ok(distance)
}

/// Fail unless `target` shares or borders the actor's cell.
pub fn ensure_adjacent(actor: &Agent, target: &Agent) -> Result<(), ActionError> {
    let distance = manhattan_distance(actor.position, target.position);
    if distance > 1 {
        return Err(ActionError::NotAdjacent { distance });
    }
    Ok(())
}

/// A handler's successful output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Change to the acting agent.
    pub delta: AgentDelta,
    /// Changes to everything else.
    pub effects: Vec<WorldEffect>,
    /// Events describing the outcome.
    pub events: Vec<Event>,
}

impl Resolution {
    /// A resolution whose delta already carries the action's cost.
    pub fn charged(cost: &Cost) -> Self {
        Self {
            delta: AgentDelta {
                energy: -cost.energy,
                hunger: -cost.hunger,
                ..AgentDelta::default()
            },
            ..Self::default()
        }
    }
}

/// Strategy object for one action type.
pub trait ActionHandler: Send + Sync {
    /// The action this handler resolves.
    fn action_type(&self) -> ActionType;

    /// Validate and resolve one intent against the tick-start world.
    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError>;
}

/// Lookup table from action type to handler.
pub struct ActionResolver {
    handlers: BTreeMap<ActionType, Box<dyn ActionHandler>>,
    config: ActionConfig,
}

impl ActionResolver {
    /// A resolver with no handlers registered.
    pub fn empty(config: ActionConfig) -> Self {
        Self {
            handlers: BTreeMap::new(),
            config,
        }
    }

    /// A resolver with the full handler catalogue.
    pub fn new(config: ActionConfig) -> Self {
        let mut resolver = Self::empty(config);
        resolver.register(Box::new(movement::MoveHandler));
        resolver.register(Box::new(survival::GatherHandler));
        resolver.register(Box::new(survival::EatHandler));
        resolver.register(Box::new(survival::SleepHandler));
        resolver.register(Box::new(survival::WorkHandler));
        resolver.register(Box::new(survival::IdleHandler));
        resolver.register(Box::new(exchange::TradeHandler));
        resolver.register(Box::new(exchange::OfferJobHandler));
        resolver.register(Box::new(exchange::AcceptJobHandler));
        resolver.register(Box::new(exchange::PayWorkerHandler));
        resolver.register(Box::new(combat::HarmHandler));
        resolver.register(Box::new(combat::StealHandler));
        resolver.register(Box::new(deception::DeceiveHandler));
        resolver.register(Box::new(social::ShareInfoHandler));
        resolver.register(Box::new(social::GossipHandler));
        resolver.register(Box::new(territory::ClaimHandler));
        resolver.register(Box::new(territory::NameLocationHandler));
        resolver.register(Box::new(territory::SignalHandler));
        resolver.register(Box::new(reproduction::SpawnOffspringHandler));
        resolver.register(Box::new(credentials::IssueCredentialHandler));
        resolver.register(Box::new(credentials::RevokeCredentialHandler));
        resolver
    }

    /// Register a handler, replacing any previous one for its action type.
    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(handler.action_type(), handler);
    }

    /// Whether a handler exists for `action`.
    pub fn handles(&self, action: ActionType) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Tunables the handlers read.
    pub const fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Resolve one intent. Never fails: rejections become failed results
    /// carrying an `action_failed` event.
    pub fn resolve(
        &self,
        intent: &ActionIntent,
        world: &WorldState,
        rng: &mut dyn RngCore,
    ) -> ActionResult {
        let outcome = self.try_resolve(intent, world, rng);
        match outcome {
            Ok(resolution) => {
                ActionResult::succeeded(resolution.delta, resolution.effects, resolution.events)
            }
            Err(error) => {
                debug!(
                    agent_id = %intent.agent_id,
                    action = %intent.action_type(),
                    error = %error,
                    "Action rejected"
                );
                failure(intent, &error)
            }
        }
    }

    fn try_resolve(
        &self,
        intent: &ActionIntent,
        world: &WorldState,
        rng: &mut dyn RngCore,
    ) -> Result<Resolution, ActionError> {
        let agent = world
            .agent(intent.agent_id)
            .ok_or(ActionError::TargetNotFound(intent.agent_id))?;
        if !agent.is_alive() {
            return Err(ActionError::AgentDead);
        }
        let handler = self
            .handlers
            .get(&intent.action_type())
            .ok_or(ActionError::NoHandler(intent.action_type()))?;
        let mut ctx = ResolutionContext {
            tick: intent.tick,
            world,
            config: &self.config,
            rng,
        };
        handler.resolve(intent, agent, &mut ctx)
    }
}

/// A failed result with its `action_failed` event.
pub fn failure(intent: &ActionIntent, error: &ActionError) -> ActionResult {
    let message = error.to_string();
    let mut result = ActionResult::failed(message.clone());
    result.events.push(Event::new(
        EventType::ActionFailed,
        intent.tick,
        Some(intent.agent_id),
        json!({ "action": intent.action_type(), "error": message }),
    ));
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_util {
    use agora_types::{ActionIntent, ActionParams, ActionResult, AgentId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::ActionResolver;
    use crate::config::ActionConfig;
    use crate::world_state::WorldState;

    /// Resolve `params` for `agent` with the full catalogue and a fixed seed.
    pub fn resolve(world: &WorldState, agent: AgentId, params: ActionParams) -> ActionResult {
        resolve_seeded(world, agent, params, 7)
    }

    /// As [`resolve`], with an explicit seed.
    pub fn resolve_seeded(
        world: &WorldState,
        agent: AgentId,
        params: ActionParams,
        seed: u64,
    ) -> ActionResult {
        let resolver = ActionResolver::new(ActionConfig::default());
        let intent = ActionIntent::new(agent, params, world.tick);
        let mut rng = StdRng::seed_from_u64(seed);
        resolver.resolve(&intent, world, &mut rng)
    }

    /// The error text of a result that must have failed.
    pub fn error_of(result: &ActionResult) -> String {
        assert!(!result.success, "expected failure, got {result:?}");
        result.error.clone().unwrap()
    }
}
