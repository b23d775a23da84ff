//! The `spawn_offspring` action.
//!
//! Two well-nourished, rested parents on the same or bordering cells produce
//! a child at the initiator's position. The initiator pays the full action
//! cost and endows the child with currency; the partner spends energy.

use std::collections::BTreeMap;

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, AgentDelta, AgentId, AgentStatus, EventType,
    Personality, WorldEffect,
};
use rand::seq::IndexedRandom;
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext, ensure_adjacent};
use crate::error::ActionError;

/// Satiety and energy a newborn starts with.
const NEWBORN_VITALS: f64 = 50.0;

/// Handler for `spawn_offspring`.
pub struct SpawnOffspringHandler;

impl SpawnOffspringHandler {
    fn check_parent(parent: &Agent, minimum: f64) -> Result<(), ActionError> {
        if parent.hunger < minimum || parent.energy < minimum {
            return Err(ActionError::OffspringRequirements(format!(
                "{} needs hunger and energy of at least {minimum}, has {:.1} and {:.1}",
                parent.name, parent.hunger, parent.energy
            )));
        }
        Ok(())
    }
}

impl ActionHandler for SpawnOffspringHandler {
    fn action_type(&self) -> ActionType {
        ActionType::SpawnOffspring
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::SpawnOffspring { partner } = intent.params else {
            return Err(ActionError::InvalidParameter(
                "expected spawn_offspring parameters".to_owned(),
            ));
        };
        let partner = ctx.living_target(agent, partner)?;
        ensure_adjacent(agent, partner)?;
        let minimum = ctx.config.offspring_min_vitals;
        Self::check_parent(agent, minimum)?;
        Self::check_parent(partner, minimum)?;
        let endowment = ctx.config.offspring_endowment;
        if agent.balance < endowment {
            return Err(ActionError::InsufficientFunds {
                required: endowment,
                available: agent.balance,
            });
        }
        let cost = affordable_cost(agent, ActionType::SpawnOffspring, ctx.config)?;

        let id = AgentId::from_random_bytes(ctx.id_bytes());
        let inherited: Vec<Personality> = [agent.personality, partner.personality]
            .into_iter()
            .flatten()
            .collect();
        let personality = inherited.choose(&mut *ctx.rng).copied();
        let short_id: String = id.to_string().chars().take(8).collect();
        let generation = agent.generation.max(partner.generation).saturating_add(1);
        let child = Agent {
            id,
            name: format!("Agent-{short_id}"),
            position: agent.position,
            hunger: NEWBORN_VITALS,
            energy: NEWBORN_VITALS,
            health: agora_types::VITAL_MAX,
            balance: endowment,
            state: AgentStatus::Idle,
            personality,
            decision_source: agent.decision_source.clone(),
            inventory: BTreeMap::new(),
            last_action: None,
            born_at_tick: ctx.tick,
            generation,
            parents: vec![agent.id, partner.id],
        };

        let mut resolution = Resolution::charged(&cost);
        resolution.delta.balance = -endowment;
        resolution.events.push(ctx.event(
            EventType::OffspringSpawned,
            agent.id,
            json!({
                "child": child.id,
                "name": child.name,
                "partner": partner.id,
                "generation": generation,
                "position": child.position,
            }),
        ));
        resolution.effects.extend([
            WorldEffect::AdjustAgent {
                agent_id: partner.id,
                delta: AgentDelta {
                    energy: -ctx.config.offspring_partner_energy,
                    ..AgentDelta::default()
                },
            },
            WorldEffect::AddAgent {
                agent: Box::new(child),
            },
        ]);
        Ok(resolution)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::actions::test_util::{error_of, resolve};
    use crate::test_support::{agent_at, world_with};

    #[test]
    fn healthy_pair_produces_a_child() {
        let mut a = agent_at(1, 3, 3);
        a.personality = Some(Personality::Curious);
        a.generation = 2;
        let mut b = agent_at(2, 3, 4);
        b.personality = Some(Personality::Curious);
        let mut world = world_with(vec![a.clone(), b.clone()]);

        let params = ActionParams::SpawnOffspring { partner: b.id };
        let result = resolve(&world, a.id, params.clone());
        assert!(result.success, "{:?}", result.error);

        let snapshot = world.clone();
        let intent = ActionIntent::new(a.id, params, 1);
        world.apply_result(&intent, &result, &snapshot, 10).unwrap();

        assert_eq!(world.agents.len(), 3);
        let child = world
            .agents
            .values()
            .find(|c| c.parents == vec![a.id, b.id])
            .unwrap();
        assert_eq!(child.generation, 3);
        assert_eq!(child.position, a.position);
        assert_eq!(child.personality, Some(Personality::Curious));
        assert_eq!(child.balance, rust_decimal::Decimal::TEN);
        assert_eq!(world.agent(b.id).unwrap().energy, 90.0);
        assert_eq!(world.agent(a.id).unwrap().energy, 80.0);
    }

    #[test]
    fn hungry_partner_cannot_reproduce() {
        let a = agent_at(1, 3, 3);
        let mut b = agent_at(2, 3, 4);
        b.hunger = 40.0;
        let world = world_with(vec![a.clone(), b.clone()]);
        let result = resolve(&world, a.id, ActionParams::SpawnOffspring { partner: b.id });
        assert!(error_of(&result).starts_with("Cannot spawn offspring: Agent2 needs"));
    }

    #[test]
    fn partner_must_be_adjacent() {
        let a = agent_at(1, 3, 3);
        let b = agent_at(2, 6, 6);
        let world = world_with(vec![a.clone(), b.clone()]);
        let result = resolve(&world, a.id, ActionParams::SpawnOffspring { partner: b.id });
        assert!(!result.success);
    }
}
