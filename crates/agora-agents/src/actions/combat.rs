//! Hostile actions: `harm` and `steal`.
//!
//! Both need the victim on the same or a bordering cell. Harm always lands;
//! theft rolls against `steal_success_chance` on the thief's stream. Either
//! way the victim's trust toward the aggressor falls and the victim keeps a
//! negative memory of it.

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, AgentDelta, EventType, MemoryKind, Valence,
    WorldEffect,
};
use rand::Rng;
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext, ensure_adjacent};
use crate::error::ActionError;

/// Trust the victim loses toward an attacker.
const HARM_TRUST_PENALTY: f64 = -20.0;
/// Trust the victim loses toward a thief who got away with it.
const THEFT_TRUST_PENALTY: f64 = -10.0;
/// Trust the victim loses toward a thief caught in the act.
const CAUGHT_TRUST_PENALTY: f64 = -25.0;

/// Handler for `harm`.
pub struct HarmHandler;

impl ActionHandler for HarmHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Harm
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Harm { target } = intent.params else {
            return Err(ActionError::InvalidParameter("expected harm parameters".to_owned()));
        };
        let victim = ctx.living_target(agent, target)?;
        ensure_adjacent(agent, victim)?;
        let cost = affordable_cost(agent, ActionType::Harm, ctx.config)?;
        let damage = ctx.config.harm_damage;

        let memory = ctx.memory(
            victim.id,
            MemoryKind::Interaction,
            format!("{} attacked me", agent.name),
            0.9,
            Valence::Negative,
            Some(agent.id),
        );
        let mut resolution = Resolution::charged(&cost);
        resolution.effects.extend([
            WorldEffect::AdjustAgent {
                agent_id: victim.id,
                delta: AgentDelta {
                    health: -damage,
                    ..AgentDelta::default()
                },
            },
            WorldEffect::AdjustTrust {
                from: victim.id,
                to: agent.id,
                amount: HARM_TRUST_PENALTY,
            },
            WorldEffect::RecordMemory { memory },
        ]);
        resolution.events.push(ctx.event(
            EventType::AgentHarmed,
            agent.id,
            json!({
                "target": victim.id,
                "damage": damage,
                "targetHealth": (victim.health - damage).max(0.0),
            }),
        ));
        Ok(resolution)
    }
}

/// Handler for `steal`: try to take one unit of `item` from the target.
pub struct StealHandler;

impl ActionHandler for StealHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Steal
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Steal { target, item } = intent.params else {
            return Err(ActionError::InvalidParameter("expected steal parameters".to_owned()));
        };
        let victim = ctx.living_target(agent, target)?;
        ensure_adjacent(agent, victim)?;
        let held = victim.item_count(item);
        if held == 0 {
            return Err(ActionError::ItemNotHeld {
                item,
                requested: 1,
                held,
            });
        }
        let cost = affordable_cost(agent, ActionType::Steal, ctx.config)?;

        let chance = ctx.config.steal_success_chance.clamp(0.0, 1.0);
        let success = ctx.rng.random_bool(chance);

        let mut resolution = Resolution::charged(&cost);
        let (trust, content) = if success {
            resolution.delta.add_item(item, 1);
            let mut victim_delta = AgentDelta::default();
            victim_delta.add_item(item, -1);
            resolution.effects.push(WorldEffect::AdjustAgent {
                agent_id: victim.id,
                delta: victim_delta,
            });
            (THEFT_TRUST_PENALTY, format!("{} stole my {item:?}", agent.name))
        } else {
            (
                CAUGHT_TRUST_PENALTY,
                format!("{} tried to steal my {item:?}", agent.name),
            )
        };
        let memory = ctx.memory(
            victim.id,
            MemoryKind::Interaction,
            content,
            0.8,
            Valence::Negative,
            Some(agent.id),
        );
        resolution.effects.extend([
            WorldEffect::AdjustTrust {
                from: victim.id,
                to: agent.id,
                amount: trust,
            },
            WorldEffect::RecordMemory { memory },
        ]);
        resolution.events.push(ctx.event(
            EventType::TheftAttempted,
            agent.id,
            json!({ "target": victim.id, "item": item, "success": success }),
        ));
        Ok(resolution)
    }
}
