//! Place-bound actions: `claim`, `name_location`, `signal`.

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, EventType, LocationClaim, Signal, SignalId,
    WorldEffect,
};
use agora_world::{WorldError, validate_name};
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext};
use crate::error::ActionError;

/// Handler for `claim`: take the current cell.
///
/// A claim held by a dead agent lapses and can be taken over.
pub struct ClaimHandler;

impl ActionHandler for ClaimHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Claim
    }

    fn resolve(
        &self,
        _intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let previous = ctx.world.claim_at(agent.position);
        if let Some(existing) = previous {
            if existing.claimant == agent.id {
                return Err(ActionError::AlreadyYours);
            }
            let holder_alive = ctx
                .world
                .agent(existing.claimant)
                .is_some_and(Agent::is_alive);
            if holder_alive {
                return Err(ActionError::AlreadyClaimed(existing.claimant));
            }
        }
        let cost = affordable_cost(agent, ActionType::Claim, ctx.config)?;

        let mut resolution = Resolution::charged(&cost);
        resolution.effects.push(WorldEffect::ClaimLocation {
            claim: LocationClaim {
                position: agent.position,
                claimant: agent.id,
                tick: ctx.tick,
            },
        });
        resolution.events.push(ctx.event(
            EventType::LocationClaimed,
            agent.id,
            json!({
                "position": agent.position,
                "previousClaimant": previous.map(|c| c.claimant),
            }),
        ));
        Ok(resolution)
    }
}

/// Handler for `name_location`: propose or endorse a name for the current
/// cell.
pub struct NameLocationHandler;

impl ActionHandler for NameLocationHandler {
    fn action_type(&self) -> ActionType {
        ActionType::NameLocation
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::NameLocation { name } = &intent.params else {
            return Err(ActionError::InvalidParameter(
                "expected name_location parameters".to_owned(),
            ));
        };
        let name = validate_name(name).map_err(|e| match e {
            WorldError::InvalidName { reason } => ActionError::InvalidName(reason),
            other => ActionError::InvalidName(other.to_string()),
        })?;
        let cost = affordable_cost(agent, ActionType::NameLocation, ctx.config)?;

        let usage_count = ctx
            .world
            .names
            .names_at(agent.position)
            .iter()
            .find(|n| n.name == name)
            .map_or(1, |n| n.usage_count.saturating_add(1));

        let mut resolution = Resolution::charged(&cost);
        resolution.events.push(ctx.event(
            EventType::LocationNamed,
            agent.id,
            json!({
                "position": agent.position,
                "name": name,
                "usageCount": usage_count,
            }),
        ));
        resolution.effects.push(WorldEffect::ProposeName {
            position: agent.position,
            name,
            proposer: agent.id,
        });
        Ok(resolution)
    }
}

/// Handler for `signal`: broadcast a short message around the current cell.
pub struct SignalHandler;

impl ActionHandler for SignalHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Signal
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Signal { message } = &intent.params else {
            return Err(ActionError::InvalidParameter("expected signal parameters".to_owned()));
        };
        let message = message.trim();
        let length = message.chars().count();
        if length == 0 || length > ctx.config.max_signal_chars {
            return Err(ActionError::InvalidParameter(format!(
                "signal must be between 1 and {} characters, got {length}",
                ctx.config.max_signal_chars
            )));
        }
        let cost = affordable_cost(agent, ActionType::Signal, ctx.config)?;
        let signal = Signal {
            id: SignalId::from_random_bytes(ctx.id_bytes()),
            emitter: agent.id,
            position: agent.position,
            message: message.to_owned(),
            radius: ctx.config.signal_radius,
            tick: ctx.tick,
        };

        let mut resolution = Resolution::charged(&cost);
        resolution.events.push(ctx.event(
            EventType::SignalEmitted,
            agent.id,
            json!({
                "signalId": signal.id,
                "position": signal.position,
                "radius": signal.radius,
                "message": signal.message,
            }),
        ));
        resolution.effects.push(WorldEffect::EmitSignal { signal });
        Ok(resolution)
    }
}
