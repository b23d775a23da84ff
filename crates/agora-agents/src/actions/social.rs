//! Word of mouth: `share_info` and `gossip`.
//!
//! Both create referral knowledge in the listener one hop deeper than the
//! speaker's own knowledge of the subject. Introducing yourself is the one
//! exception: the listener then learns about the speaker first hand.

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, AgentId, EventType, MemoryKind, Referral,
    SharedInfo, Valence, WorldEffect,
};
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext, ensure_in_range};
use crate::error::ActionError;
use crate::relationships::credibility;

/// Bounds of a gossip opinion.
const OPINION_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

/// How the speaker knows the subject, as referral metadata for the
/// listener. `None` means the speaker is the subject.
fn referral_for(
    ctx: &ResolutionContext<'_>,
    speaker: &Agent,
    subject: AgentId,
) -> Result<(Option<Referral>, SharedInfo), ActionError> {
    if subject == speaker.id {
        let info = SharedInfo {
            last_known_position: Some(speaker.position),
            ..SharedInfo::default()
        };
        return Ok((None, info));
    }
    let record = ctx
        .world
        .knowledge
        .get(speaker.id, subject)
        .ok_or(ActionError::UnknownSubject(subject))?;
    let referral = Referral {
        referrer: speaker.id,
        referrer_depth: record.referral_depth,
    };
    Ok((Some(referral), record.shared_info))
}

/// Handler for `share_info`: tell the target what you know about `subject`.
pub struct ShareInfoHandler;

impl ActionHandler for ShareInfoHandler {
    fn action_type(&self) -> ActionType {
        ActionType::ShareInfo
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::ShareInfo { target, subject } = intent.params else {
            return Err(ActionError::InvalidParameter(
                "expected share_info parameters".to_owned(),
            ));
        };
        let listener = ctx.living_target(agent, target)?;
        if subject == listener.id {
            return Err(ActionError::InvalidParameter(
                "cannot tell an agent about themselves".to_owned(),
            ));
        }
        ensure_in_range(agent, listener, ctx.config.communication_range)?;
        let (referral, info) = referral_for(ctx, agent, subject)?;
        let cost = affordable_cost(agent, ActionType::ShareInfo, ctx.config)?;
        let depth = referral.map_or(0, |r| r.referrer_depth.saturating_add(1));

        let mut resolution = Resolution::charged(&cost);
        resolution.effects.push(WorldEffect::RecordKnowledge {
            observer: listener.id,
            known: subject,
            referral,
            info,
        });
        resolution.events.push(ctx.event(
            EventType::InfoShared,
            agent.id,
            json!({
                "target": listener.id,
                "subject": subject,
                "referralDepth": depth,
            }),
        ));
        Ok(resolution)
    }
}

/// Handler for `gossip`: pass on an opinion of `subject`.
///
/// The listener's trust in the subject shifts by the opinion, weighted by how
/// much the listener trusts the gossiper.
pub struct GossipHandler;

impl ActionHandler for GossipHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Gossip
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Gossip {
            target,
            subject,
            opinion,
        } = intent.params
        else {
            return Err(ActionError::InvalidParameter("expected gossip parameters".to_owned()));
        };
        if !OPINION_RANGE.contains(&opinion) {
            return Err(ActionError::InvalidParameter(format!(
                "opinion must be between -100 and 100, got {opinion}"
            )));
        }
        let listener = ctx.living_target(agent, target)?;
        if subject == listener.id {
            return Err(ActionError::InvalidParameter(
                "cannot gossip to an agent about themselves".to_owned(),
            ));
        }
        ensure_in_range(agent, listener, ctx.config.communication_range)?;
        let (referral, mut info) = referral_for(ctx, agent, subject)?;
        let cost = affordable_cost(agent, ActionType::Gossip, ctx.config)?;

        let opinion = f64::from(opinion);
        info.reputation = Some(opinion);
        let belief = credibility(ctx.world.relationships.trust(listener.id, agent.id));
        let shift = opinion * ctx.config.gossip_weight * belief;
        let valence = if opinion > 0.0 {
            Valence::Positive
        } else if opinion < 0.0 {
            Valence::Negative
        } else {
            Valence::Neutral
        };
        let subject_name = ctx
            .world
            .agent(subject)
            .map_or_else(|| subject.to_string(), |a| a.name.clone());
        let memory = ctx.memory(
            listener.id,
            MemoryKind::Interaction,
            format!("{} told me about {subject_name}", agent.name),
            0.4 * belief,
            valence,
            Some(subject),
        );

        let mut resolution = Resolution::charged(&cost);
        resolution.effects.extend([
            WorldEffect::RecordKnowledge {
                observer: listener.id,
                known: subject,
                referral,
                info,
            },
            WorldEffect::AdjustTrust {
                from: listener.id,
                to: subject,
                amount: shift,
            },
            WorldEffect::RecordMemory { memory },
        ]);
        resolution.events.push(ctx.event(
            EventType::GossipSpread,
            agent.id,
            json!({
                "target": listener.id,
                "subject": subject,
                "opinion": opinion,
                "trustShift": shift,
            }),
        ));
        Ok(resolution)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use agora_types::{DiscoveryType, Position};

    use super::*;
    use crate::actions::test_util::{error_of, resolve};
    use crate::test_support::{agent_at, world_with};

    #[test]
    fn sharing_creates_referral_one_hop_deeper() {
        let a = agent_at(1, 0, 0);
        let b = agent_at(2, 1, 0);
        let c = agent_at(3, 15, 15);
        let mut world = world_with(vec![a.clone(), b.clone(), c.clone()]);
        world.knowledge.record_direct_discovery(
            a.id,
            c.id,
            SharedInfo {
                last_known_position: Some(Position::new(15, 15)),
                ..SharedInfo::default()
            },
            1,
        );

        let params = ActionParams::ShareInfo {
            target: b.id,
            subject: c.id,
        };
        let result = resolve(&world, a.id, params.clone());
        assert!(result.success);
        let snapshot = world.clone();
        let intent = ActionIntent::new(a.id, params, 1);
        world.apply_result(&intent, &result, &snapshot, 10).unwrap();

        let record = world.knowledge.get(b.id, c.id).unwrap();
        assert_eq!(record.discovery_type, DiscoveryType::Referral);
        assert_eq!(record.referral_depth, 1);
        assert_eq!(record.referred_by, Some(a.id));
        assert_eq!(record.shared_info.last_known_position, Some(Position::new(15, 15)));
    }

    #[test]
    fn introducing_yourself_is_direct() {
        let a = agent_at(1, 0, 0);
        let b = agent_at(2, 1, 0);
        let world = world_with(vec![a.clone(), b.clone()]);
        let result = resolve(
            &world,
            a.id,
            ActionParams::ShareInfo {
                target: b.id,
                subject: a.id,
            },
        );
        let Some(WorldEffect::RecordKnowledge { referral, .. }) = result.effects.first() else {
            panic!("expected a knowledge effect");
        };
        assert_eq!(*referral, None);
    }

    #[test]
    fn cannot_share_what_you_do_not_know() {
        let a = agent_at(1, 0, 0);
        let b = agent_at(2, 1, 0);
        let c = agent_at(3, 2, 0);
        let world = world_with(vec![a.clone(), b.clone(), c.clone()]);
        let result = resolve(
            &world,
            a.id,
            ActionParams::ShareInfo {
                target: b.id,
                subject: c.id,
            },
        );
        assert!(error_of(&result).starts_with("You know nothing about agent"));
    }

    #[test]
    fn gossip_shifts_trust_by_credibility() {
        let a = agent_at(1, 0, 0);
        let b = agent_at(2, 1, 0);
        let c = agent_at(3, 2, 0);
        let mut world = world_with(vec![a.clone(), b.clone(), c.clone()]);
        world
            .knowledge
            .record_direct_discovery(a.id, c.id, SharedInfo::default(), 1);

        let result = resolve(
            &world,
            a.id,
            ActionParams::Gossip {
                target: b.id,
                subject: c.id,
                opinion: -60,
            },
        );
        let shift = result.effects.iter().find_map(|e| match e {
            WorldEffect::AdjustTrust { from, to, amount } if *from == b.id && *to == c.id => {
                Some(*amount)
            }
            _ => None,
        });
        // -60 * 0.1 * credibility(0) = -3
        assert_eq!(shift, Some(-3.0));
        let info = result.effects.iter().find_map(|e| match e {
            WorldEffect::RecordKnowledge { info, .. } => Some(info.reputation),
            _ => None,
        });
        assert_eq!(info, Some(Some(-60.0)));
    }

    #[test]
    fn gossip_opinion_is_bounded() {
        let a = agent_at(1, 0, 0);
        let b = agent_at(2, 1, 0);
        let world = world_with(vec![a.clone(), b.clone()]);
        let result = resolve(
            &world,
            a.id,
            ActionParams::Gossip {
                target: b.id,
                subject: a.id,
                opinion: 101,
            },
        );
        assert!(error_of(&result).contains("between -100 and 100"));
    }
}
