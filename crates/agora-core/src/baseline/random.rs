//! Uniform random choice among the currently valid actions.
//!
//! Parameters are drawn at random too, but always within the ranges the
//! resolver accepts, so the chosen action can actually pass validation.

use agora_agents::ActionConfig;
use agora_types::{
    ActionParams, ActionType, ClaimType, Decision, EmploymentStatus, NearbyAgent, Observation,
    PaymentType, ResourceType,
};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, RngCore};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::{BaselineStrategy, critical_survival, random_step};

const CLAIM_TYPES: [ClaimType; 5] = [
    ClaimType::ResourceLocation,
    ClaimType::AgentReputation,
    ClaimType::DangerWarning,
    ClaimType::TradeOpportunity,
    ClaimType::ShelterLocation,
];

const PAYMENT_TYPES: [PaymentType; 3] = [
    PaymentType::Upfront,
    PaymentType::OnCompletion,
    PaymentType::PerTick,
];

const PLACE_WORDS: [&str; 8] = [
    "Oak", "Stone", "River", "Ember", "Hollow", "Ridge", "Meadow", "Crossing",
];

const SIGNALS: [&str; 4] = [
    "food nearby",
    "looking to trade",
    "danger, keep away",
    "need help",
];

const TITLES: [&str; 4] = [
    "reliable trader",
    "good neighbour",
    "skilled gatherer",
    "honest worker",
];

/// Picks any valid action with random in-range parameters.
pub struct RandomStrategy {
    actions: ActionConfig,
}

impl RandomStrategy {
    /// A strategy using the resolver's range and price limits.
    pub fn new(actions: &ActionConfig) -> Self {
        Self {
            actions: actions.clone(),
        }
    }

    fn agent_within<'a>(
        obs: &'a Observation,
        rng: &mut dyn RngCore,
        accept: impl Fn(&NearbyAgent) -> bool,
    ) -> Option<&'a NearbyAgent> {
        let candidates: Vec<&NearbyAgent> =
            obs.nearby_agents.iter().filter(|a| accept(a)).collect();
        candidates.choose(rng).copied()
    }

    /// Parameters for `action`, or `None` when nothing in view makes it
    /// possible after all.
    fn params_for(
        &self,
        action: ActionType,
        obs: &Observation,
        rng: &mut dyn RngCore,
    ) -> Option<ActionParams> {
        let me = &obs.self_state;
        let talk = self.actions.communication_range;
        let params = match action {
            ActionType::Move => return random_step(obs, rng),
            ActionType::Gather => ActionParams::Gather,
            ActionType::Eat => {
                let food: Vec<ResourceType> = me
                    .inventory
                    .iter()
                    .filter(|(item, count)| item.is_consumable() && **count > 0)
                    .map(|(item, _)| *item)
                    .collect();
                ActionParams::Eat {
                    item: *food.choose(rng)?,
                }
            }
            ActionType::Sleep => ActionParams::Sleep,
            ActionType::Work => ActionParams::Work,
            ActionType::Trade => {
                let range = self.actions.trade_range;
                let buyer = Self::agent_within(obs, rng, |a| (1..=range).contains(&a.distance))?;
                let held: Vec<(ResourceType, u32)> = me
                    .inventory
                    .iter()
                    .filter(|(_, count)| **count > 0)
                    .map(|(item, count)| (*item, *count))
                    .collect();
                let (item, count) = *held.choose(rng)?;
                let quantity = rng.random_range(1..=count);
                let top = self
                    .actions
                    .max_trade_price(item, quantity)
                    .floor()
                    .to_u32()
                    .unwrap_or(u32::MAX);
                ActionParams::Trade {
                    target: buyer.id,
                    item,
                    quantity,
                    price: Decimal::from(rng.random_range(top.min(1)..=top)),
                }
            }
            ActionType::Harm => ActionParams::Harm {
                target: Self::agent_within(obs, rng, |a| a.distance <= 1)?.id,
            },
            ActionType::Steal => ActionParams::Steal {
                target: Self::agent_within(obs, rng, |a| a.distance <= 1 && a.has_items)?.id,
                item: *ResourceType::ALL.choose(rng)?,
            },
            ActionType::Deceive => {
                let target = Self::agent_within(obs, rng, |a| a.distance <= talk)?;
                let claim_type = *CLAIM_TYPES.choose(rng)?;
                let x = rng.random_range(0..obs.world_size.max(1));
                let y = rng.random_range(0..obs.world_size.max(1));
                ActionParams::Deceive {
                    target: target.id,
                    claim_type: claim_type.as_str().to_owned(),
                    claim: format!("there is something worth seeing at {x},{y}"),
                }
            }
            ActionType::ShareInfo => {
                let target = Self::agent_within(obs, rng, |a| a.distance <= talk)?;
                ActionParams::ShareInfo {
                    target: target.id,
                    subject: Self::subject_for(obs, target, rng),
                }
            }
            ActionType::Gossip => {
                let target = Self::agent_within(obs, rng, |a| a.distance <= talk)?;
                ActionParams::Gossip {
                    target: target.id,
                    subject: Self::subject_for(obs, target, rng),
                    opinion: rng.random_range(-100..=100),
                }
            }
            ActionType::OfferJob => {
                let ceiling = me.balance.floor().min(Decimal::TEN);
                if ceiling < Decimal::ONE {
                    return None;
                }
                let top = ceiling.to_u32()?;
                ActionParams::OfferJob {
                    salary: Decimal::from(rng.random_range(1..=top)),
                    duration_ticks: rng.random_range(1..=5),
                    payment_type: *PAYMENT_TYPES.choose(rng)?,
                }
            }
            ActionType::AcceptJob => ActionParams::AcceptJob {
                employment_id: obs.job_offers.choose(rng)?.id,
            },
            ActionType::PayWorker => {
                let mine: Vec<_> = obs
                    .employment
                    .iter()
                    .filter(|e| e.employer == me.id && e.status == EmploymentStatus::Active)
                    .collect();
                ActionParams::PayWorker {
                    employment_id: mine.choose(rng)?.id,
                }
            }
            ActionType::Claim => ActionParams::Claim,
            ActionType::NameLocation => {
                let first = PLACE_WORDS.choose(rng)?;
                let second = PLACE_WORDS.choose(rng)?;
                ActionParams::NameLocation {
                    name: format!("{first} {second}"),
                }
            }
            ActionType::Signal => ActionParams::Signal {
                message: (*SIGNALS.choose(rng)?).to_owned(),
            },
            ActionType::SpawnOffspring => ActionParams::SpawnOffspring {
                partner: Self::agent_within(obs, rng, |a| a.distance <= 1)?.id,
            },
            ActionType::IssueCredential => ActionParams::IssueCredential {
                subject: Self::agent_within(obs, rng, |a| a.distance <= talk)?.id,
                title: (*TITLES.choose(rng)?).to_owned(),
            },
            ActionType::RevokeCredential => {
                let issued: Vec<_> = obs
                    .credentials
                    .iter()
                    .filter(|c| c.issuer == me.id && c.revoked_tick.is_none())
                    .collect();
                ActionParams::RevokeCredential {
                    credential_id: issued.choose(rng)?.id,
                }
            }
            ActionType::Idle => ActionParams::Idle,
        };
        Some(params)
    }

    /// Someone the speaker knows other than the listener, or the speaker.
    fn subject_for(
        obs: &Observation,
        listener: &NearbyAgent,
        rng: &mut dyn RngCore,
    ) -> agora_types::AgentId {
        let known: Vec<_> = obs
            .knowledge
            .iter()
            .map(|k| k.known)
            .filter(|id| *id != listener.id)
            .collect();
        known.choose(rng).copied().unwrap_or(obs.self_state.id)
    }
}

impl BaselineStrategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn decide(&self, observation: &Observation, rng: &mut dyn RngCore) -> Decision {
        if let Some(decision) = critical_survival(observation) {
            return decision;
        }
        let mut candidates = observation.valid_actions.clone();
        candidates.shuffle(rng);
        candidates
            .into_iter()
            .find_map(|action| self.params_for(action, observation, rng))
            .map_or_else(
                || Decision::new(ActionParams::Idle).with_reasoning("nothing valid to do"),
                |params| Decision::new(params).with_reasoning("random choice"),
            )
    }
}
