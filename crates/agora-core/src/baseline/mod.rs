//! Baseline decision strategies.
//!
//! Four synchronous strategies that need nothing but the observation and a
//! random stream. They run as ordinary decision sources for scripted agents
//! and double as the fallback whenever a real decision source fails, so
//! every agent always has a valid action.
//!
//! - [`random`] -- uniform choice among currently valid actions
//! - [`rule_based`] -- a fixed survival-first priority ladder
//! - [`sugarscape`] -- always head for the richest visible cell
//! - [`q_learning`] -- tabular learner with a decaying exploration rate

pub mod q_learning;
pub mod random;
pub mod rule_based;
pub mod sugarscape;

use std::sync::Arc;

use agora_agents::ActionConfig;
use agora_types::{ActionParams, Decision, NearbyResource, Observation, Position};
use agora_world::adjacent_positions;
use futures::FutureExt;
use futures::future::BoxFuture;
use rand::RngCore;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::decision::{DecisionError, DecisionSource};
use crate::rng::{RngService, RngStream};

pub use q_learning::QLearningStrategy;
pub use random::RandomStrategy;
pub use rule_based::RuleBasedStrategy;
pub use sugarscape::SugarscapeStrategy;

/// Health below which survival overrides every strategy.
pub const CRITICAL_HEALTH: f64 = 10.0;

/// A synchronous, I/O-free decision strategy.
pub trait BaselineStrategy: Send + Sync {
    /// Registry key of the strategy.
    fn name(&self) -> &'static str;

    /// Choose an action for the observing agent.
    fn decide(&self, observation: &Observation, rng: &mut dyn RngCore) -> Decision;

    /// Forget any learned state. Stateless strategies do nothing.
    fn reset(&self) {}
}

/// The built-in strategies, as named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// [`RandomStrategy`].
    Random,
    /// [`RuleBasedStrategy`].
    #[default]
    RuleBased,
    /// [`SugarscapeStrategy`].
    Sugarscape,
    /// [`QLearningStrategy`].
    QLearning,
}

impl StrategyKind {
    /// Every built-in strategy.
    pub const ALL: [Self; 4] = [Self::Random, Self::RuleBased, Self::Sugarscape, Self::QLearning];

    /// Registry key of the strategy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::RuleBased => "rule_based",
            Self::Sugarscape => "sugarscape",
            Self::QLearning => "q_learning",
        }
    }

    /// Instantiate the strategy.
    pub fn build(self, actions: &ActionConfig) -> Arc<dyn BaselineStrategy> {
        match self {
            Self::Random => Arc::new(RandomStrategy::new(actions)),
            Self::RuleBased => Arc::new(RuleBasedStrategy),
            Self::Sugarscape => Arc::new(SugarscapeStrategy),
            Self::QLearning => Arc::new(QLearningStrategy::new()),
        }
    }
}

/// Adapts a [`BaselineStrategy`] into a [`DecisionSource`].
///
/// Each decision draws from the run's decision stream for that agent and
/// tick, so a replay with the same seed decides identically.
pub struct BaselineSource {
    strategy: Arc<dyn BaselineStrategy>,
    rng: RngService,
}

impl BaselineSource {
    /// Wrap `strategy`, drawing randomness from `rng`.
    pub fn new(strategy: Arc<dyn BaselineStrategy>, rng: RngService) -> Self {
        Self { strategy, rng }
    }

    /// The wrapped strategy.
    pub fn strategy(&self) -> &Arc<dyn BaselineStrategy> {
        &self.strategy
    }
}

impl DecisionSource for BaselineSource {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    fn decide<'a>(
        &'a self,
        observation: &'a Observation,
    ) -> BoxFuture<'a, Result<Decision, DecisionError>> {
        let mut rng = self.rng.stream(
            observation.tick,
            observation.self_state.id,
            RngStream::Decision,
        );
        let decision = self.strategy.decide(observation, &mut rng);
        futures::future::ready(Ok(decision)).boxed()
    }
}

/// The survival override shared by every strategy: below
/// [`CRITICAL_HEALTH`], eat if there is anything to eat, otherwise sleep.
pub fn critical_survival(observation: &Observation) -> Option<Decision> {
    if observation.self_state.health >= CRITICAL_HEALTH {
        return None;
    }
    let decision = observation.best_food().map_or_else(
        || Decision::new(ActionParams::Sleep).with_reasoning("critical health, resting"),
        |item| Decision::new(ActionParams::Eat { item }).with_reasoning("critical health, eating"),
    );
    Some(decision)
}

/// Head for `target`. The resolver takes one step per tick.
pub const fn move_toward(target: Position) -> ActionParams {
    ActionParams::Move {
        x: target.x,
        y: target.y,
    }
}

/// A move to a random in-bounds neighbouring cell.
pub fn random_step(observation: &Observation, rng: &mut dyn RngCore) -> Option<ActionParams> {
    let neighbours = adjacent_positions(observation.self_state.position, observation.world_size);
    neighbours.choose(rng).copied().map(move_toward)
}

/// The visible spawn with the most units, nearest first on ties, among
/// those matching `wanted`.
pub fn richest_resource<F>(observation: &Observation, wanted: F) -> Option<&NearbyResource>
where
    F: Fn(&NearbyResource) -> bool,
{
    observation
        .nearby_resources
        .iter()
        .filter(|r| r.amount > 0 && wanted(r))
        .min_by(|a, b| b.amount.cmp(&a.amount).then(a.distance.cmp(&b.distance)))
}

/// The nearest visible non-empty spawn matching `wanted`.
pub fn nearest_resource<F>(observation: &Observation, wanted: F) -> Option<&NearbyResource>
where
    F: Fn(&NearbyResource) -> bool,
{
    observation
        .nearby_resources
        .iter()
        .filter(|r| r.amount > 0 && wanted(r))
        .min_by_key(|r| r.distance)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use agora_types::{
        ActionType, AgentId, AgentStatus, CompassDirection, Observation, Position, ResourceType,
        SelfState, SpawnId,
    };
    use agora_types::NearbyResource;
    use rust_decimal::Decimal;

    pub(crate) fn observation_at(x: i32, y: i32) -> Observation {
        Observation {
            tick: 1,
            world_size: 20,
            self_state: SelfState {
                id: AgentId::from_random_bytes([1; 16]),
                name: "Agent1".to_owned(),
                position: Position::new(x, y),
                hunger: 80.0,
                energy: 80.0,
                health: 100.0,
                balance: Decimal::from(50),
                state: AgentStatus::Idle,
                personality: None,
                inventory: BTreeMap::new(),
                last_action: None,
            },
            nearby_agents: Vec::new(),
            nearby_resources: Vec::new(),
            nearby_shelters: Vec::new(),
            nearby_claims: Vec::new(),
            nearby_names: Vec::new(),
            nearby_signals: Vec::new(),
            scents: Vec::new(),
            recent_events: Vec::new(),
            relationships: Vec::new(),
            knowledge: Vec::new(),
            employment: Vec::new(),
            job_offers: Vec::new(),
            credentials: Vec::new(),
            last_result: None,
            valid_actions: vec![
                ActionType::Move,
                ActionType::Sleep,
                ActionType::Work,
                ActionType::Claim,
                ActionType::NameLocation,
                ActionType::Signal,
                ActionType::Idle,
            ],
        }
    }

    pub(crate) fn resource(
        seed: u8,
        x: i32,
        y: i32,
        resource_type: ResourceType,
        amount: u32,
        from: Position,
    ) -> NearbyResource {
        let position = Position::new(x, y);
        NearbyResource {
            spawn_id: SpawnId::from_random_bytes([seed; 16]),
            position,
            resource_type,
            amount,
            distance: agora_world::manhattan_distance(from, position),
            direction: if from == position {
                CompassDirection::Here
            } else {
                agora_world::compass_direction(from, position)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agora_types::ResourceType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::test_support::{observation_at, resource};
    use super::*;

    #[test]
    fn critical_health_eats_when_possible() {
        let mut obs = observation_at(3, 3);
        obs.self_state.health = 9.0;
        assert_eq!(critical_survival(&obs).unwrap().action, ActionParams::Sleep);

        obs.self_state.inventory.insert(ResourceType::Water, 1);
        assert_eq!(
            critical_survival(&obs).unwrap().action,
            ActionParams::Eat {
                item: ResourceType::Water
            }
        );

        obs.self_state.health = 10.0;
        assert!(critical_survival(&obs).is_none());
    }

    #[test]
    fn richest_prefers_amount_then_distance() {
        let mut obs = observation_at(5, 5);
        let here = Position::new(5, 5);
        obs.nearby_resources = vec![
            resource(1, 8, 5, ResourceType::Food, 9, here),
            resource(2, 6, 5, ResourceType::Water, 9, here),
            resource(3, 5, 9, ResourceType::Food, 3, here),
        ];
        let best = richest_resource(&obs, |_| true).unwrap();
        assert_eq!(best.position, Position::new(6, 5));
        let food = nearest_resource(&obs, |r| r.resource_type == ResourceType::Food).unwrap();
        assert_eq!(food.position, Position::new(8, 5));
    }

    #[test]
    fn random_step_stays_in_bounds() {
        let obs = observation_at(0, 0);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let Some(ActionParams::Move { x, y }) = random_step(&obs, &mut rng) else {
                panic!("expected a move");
            };
            assert!((x, y) == (1, 0) || (x, y) == (0, 1));
        }
    }

    #[tokio::test]
    async fn baseline_source_is_deterministic_per_tick() {
        let source = BaselineSource::new(
            StrategyKind::Random.build(&ActionConfig::default()),
            RngService::new(9),
        );
        let obs = observation_at(4, 4);
        let first = source.decide(&obs).await.unwrap();
        let second = source.decide(&obs).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.name(), "random");
    }

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in StrategyKind::ALL {
            let strategy = kind.build(&ActionConfig::default());
            assert_eq!(strategy.name(), kind.as_str());
        }
    }
}
