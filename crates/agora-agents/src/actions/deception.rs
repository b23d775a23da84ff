//! The `deceive` action.
//!
//! A deceptive claim is always delivered. Whether the target believes it is
//! not decided here: the target's trust toward the deceiver only scales how
//! important the received memory is. The deceiver keeps a neutral record of
//! what it said. The event carries a SHA-256 digest of the claim, never the
//! text itself, so the public event stream cannot reveal the lie.

use std::str::FromStr;

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, ClaimType, EventType, MemoryKind, Valence,
    WorldEffect,
};
use serde_json::json;
use sha2::{Digest, Sha256};

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext, ensure_in_range};
use crate::error::ActionError;
use crate::relationships::credibility;

/// Shortest accepted claim, in characters.
pub const MIN_CLAIM_CHARS: usize = 5;
/// Longest accepted claim, in characters.
pub const MAX_CLAIM_CHARS: usize = 500;

/// Hex SHA-256 of a claim.
pub fn claim_digest(claim: &str) -> String {
    hex::encode(Sha256::digest(claim.as_bytes()))
}

/// Handler for `deceive`.
pub struct DeceiveHandler;

impl ActionHandler for DeceiveHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Deceive
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Deceive {
            target,
            claim_type,
            claim,
        } = &intent.params
        else {
            return Err(ActionError::InvalidParameter("expected deceive parameters".to_owned()));
        };

        let length = claim.chars().count();
        if !(MIN_CLAIM_CHARS..=MAX_CLAIM_CHARS).contains(&length) {
            return Err(ActionError::ClaimLength { length });
        }
        let claim_type = ClaimType::from_str(claim_type)
            .map_err(|_| ActionError::UnknownClaimType(claim_type.clone()))?;
        let victim = ctx.living_target(agent, *target)?;
        ensure_in_range(agent, victim, ctx.config.communication_range)?;
        let cost = affordable_cost(agent, ActionType::Deceive, ctx.config)?;

        let trust = ctx.world.relationships.trust(victim.id, agent.id);
        let belief = credibility(trust);
        let self_record = ctx.memory(
            agent.id,
            MemoryKind::SelfRecord,
            format!(
                "Told {} a false {}: {claim}",
                victim.name,
                claim_type.as_str()
            ),
            ctx.config.self_record_importance,
            Valence::Neutral,
            Some(victim.id),
        );
        let received = ctx.memory(
            victim.id,
            MemoryKind::ReceivedClaim,
            format!("{} said: {claim}", agent.name),
            ctx.config.claim_importance * belief,
            Valence::Neutral,
            Some(agent.id),
        );

        let mut resolution = Resolution::charged(&cost);
        resolution.effects.extend([
            WorldEffect::RecordMemory {
                memory: self_record,
            },
            WorldEffect::RecordMemory { memory: received },
        ]);
        resolution.events.push(ctx.event(
            EventType::AgentDeceived,
            agent.id,
            json!({
                "target": victim.id,
                "claimType": claim_type.as_str(),
                "claimHash": claim_digest(claim),
                "credibility": belief,
            }),
        ));
        Ok(resolution)
    }
}
