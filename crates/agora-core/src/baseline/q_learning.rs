//! Tabular Q-learning over a coarse survival state.
//!
//! The state is the agent's hunger and energy quartiles plus two flags: does
//! it hold food, and is there something to gather underfoot. The action set
//! is six macro-actions that expand into concrete [`ActionParams`]. Reward
//! is the change in summed vitals between consecutive decisions.
//!
//! Every agent learns alone: its own Q-table and its own exploration rate,
//! which starts at 1.0 and decays multiplicatively on every decision down
//! to a floor. Decisions within a tick run concurrently, so an agent's
//! choice depends only on its own history and the seeded decision stream.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use agora_types::{ActionParams, AgentId, Decision, Observation};
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};

use super::{BaselineStrategy, critical_survival, move_toward, nearest_resource, random_step};

/// Learning rate.
const ALPHA: f64 = 0.1;

/// Discount factor.
const GAMMA: f64 = 0.9;

/// Exploration rate of an agent's first decision.
const INITIAL_EPSILON: f64 = 1.0;

/// Multiplicative decay applied to epsilon after every decision.
const EPSILON_DECAY: f64 = 0.995;

/// Lowest exploration rate.
const MIN_EPSILON: f64 = 0.05;

/// Discretised survival state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey {
    hunger: u8,
    energy: u8,
    has_food: bool,
    resource_here: bool,
}

impl StateKey {
    fn of(observation: &Observation) -> Self {
        let me = &observation.self_state;
        Self {
            hunger: quartile(me.hunger),
            energy: quartile(me.energy),
            has_food: observation.has_food(),
            resource_here: observation.resource_here().is_some(),
        }
    }
}

/// Bucket a `[0, 100]` value into `0..=3`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quartile(value: f64) -> u8 {
    (value.clamp(0.0, 99.999) / 25.0).floor() as u8
}

/// Macro-actions the learner chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QAction {
    /// Walk toward the nearest food, or wander.
    Forage,
    /// Gather whatever is underfoot.
    Gather,
    /// Eat the best food held.
    Eat,
    /// Sleep.
    Sleep,
    /// Work for currency.
    Work,
    /// Do nothing.
    Idle,
}

impl QAction {
    const ALL: [Self; 6] = [
        Self::Forage,
        Self::Gather,
        Self::Eat,
        Self::Sleep,
        Self::Work,
        Self::Idle,
    ];

    /// Concrete parameters, or `None` if the macro cannot apply right now.
    fn params(self, observation: &Observation, rng: &mut dyn RngCore) -> Option<ActionParams> {
        match self {
            Self::Forage => nearest_resource(observation, |r| r.resource_type.is_consumable())
                .filter(|r| r.distance > 0)
                .map(|r| move_toward(r.position))
                .or_else(|| random_step(observation, rng)),
            Self::Gather => observation.resource_here().map(|_| ActionParams::Gather),
            Self::Eat => observation.best_food().map(|item| ActionParams::Eat { item }),
            Self::Sleep => Some(ActionParams::Sleep),
            Self::Work => Some(ActionParams::Work),
            Self::Idle => Some(ActionParams::Idle),
        }
    }

    /// The macro a concrete action falls under, if any.
    const fn of(params: &ActionParams) -> Option<Self> {
        match params {
            ActionParams::Move { .. } => Some(Self::Forage),
            ActionParams::Gather => Some(Self::Gather),
            ActionParams::Eat { .. } => Some(Self::Eat),
            ActionParams::Sleep => Some(Self::Sleep),
            ActionParams::Work => Some(Self::Work),
            ActionParams::Idle => Some(Self::Idle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Learner {
    epsilon: f64,
    table: BTreeMap<(StateKey, QAction), f64>,
    /// State, action, and wellbeing at the previous decision.
    previous: Option<(StateKey, QAction, f64)>,
}

impl Default for Learner {
    fn default() -> Self {
        Self {
            epsilon: INITIAL_EPSILON,
            table: BTreeMap::new(),
            previous: None,
        }
    }
}

impl Learner {
    fn value(&self, state: StateKey, action: QAction) -> f64 {
        self.table.get(&(state, action)).copied().unwrap_or(0.0)
    }

    fn best_value(&self, state: StateKey) -> f64 {
        QAction::ALL
            .iter()
            .map(|a| self.value(state, *a))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// One-step Q update for the transition that ended in `state`.
    fn learn(&mut self, state: StateKey, wellbeing: f64) {
        let Some((prev_state, prev_action, prev_wellbeing)) = self.previous else {
            return;
        };
        let reward = wellbeing - prev_wellbeing;
        let target = reward + GAMMA * self.best_value(state);
        let entry = self.table.entry((prev_state, prev_action)).or_insert(0.0);
        *entry += ALPHA * (target - *entry);
    }
}

/// Epsilon-greedy learner with one table per agent.
#[derive(Debug, Default)]
pub struct QLearningStrategy {
    learners: Mutex<BTreeMap<AgentId, Learner>>,
}

impl QLearningStrategy {
    /// An untrained learner.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AgentId, Learner>> {
        self.learners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The agent's current exploration rate.
    pub fn exploration_rate(&self, agent: AgentId) -> f64 {
        self.lock()
            .get(&agent)
            .map_or(INITIAL_EPSILON, |l| l.epsilon)
    }

    /// The observer's learned value of `action` in its current state.
    pub fn q_value(&self, observation: &Observation, action: QAction) -> f64 {
        self.lock()
            .get(&observation.self_state.id)
            .map_or(0.0, |l| l.value(StateKey::of(observation), action))
    }

    /// Number of populated entries in `agent`'s table.
    pub fn table_len(&self, agent: AgentId) -> usize {
        self.lock().get(&agent).map_or(0, |l| l.table.len())
    }
}

fn wellbeing(observation: &Observation) -> f64 {
    let me = &observation.self_state;
    me.hunger + me.energy + me.health
}

impl BaselineStrategy for QLearningStrategy {
    fn name(&self) -> &'static str {
        "q_learning"
    }

    fn decide(&self, observation: &Observation, rng: &mut dyn RngCore) -> Decision {
        let agent = observation.self_state.id;
        let state = StateKey::of(observation);
        let now = wellbeing(observation);

        let mut learners = self.lock();
        let learner = learners.entry(agent).or_default();
        learner.learn(state, now);
        let epsilon = learner.epsilon;

        let (action, decision) = if let Some(decision) = critical_survival(observation) {
            (QAction::of(&decision.action), decision)
        } else {
            let candidates: Vec<(QAction, ActionParams)> = QAction::ALL
                .iter()
                .filter_map(|a| a.params(observation, rng).map(|p| (*a, p)))
                .collect();
            let pick = if rng.random_bool(epsilon.clamp(0.0, 1.0)) {
                candidates.choose(rng).cloned()
            } else {
                candidates.iter().fold(None::<(QAction, ActionParams)>, |best, cand| {
                    match best {
                        Some(b) if learner.value(state, b.0) >= learner.value(state, cand.0) => {
                            Some(b)
                        }
                        _ => Some(cand.clone()),
                    }
                })
            };
            match pick {
                Some((action, params)) => (
                    Some(action),
                    Decision::new(params).with_reasoning(format!(
                        "q={:.3} epsilon={epsilon:.3}",
                        learner.value(state, action)
                    )),
                ),
                None => (
                    Some(QAction::Idle),
                    Decision::new(ActionParams::Idle).with_reasoning("no candidate actions"),
                ),
            }
        };

        learner.epsilon = (learner.epsilon * EPSILON_DECAY).max(MIN_EPSILON);
        learner.previous = action.map(|a| (state, a, now));
        decision
    }

    fn reset(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use agora_types::{Position, ResourceType};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::baseline::test_support::{observation_at, resource};

    #[test]
    fn quartiles_bucket_the_range() {
        assert_eq!(quartile(0.0), 0);
        assert_eq!(quartile(24.9), 0);
        assert_eq!(quartile(25.0), 1);
        assert_eq!(quartile(74.0), 2);
        assert_eq!(quartile(100.0), 3);
        assert_eq!(quartile(-5.0), 0);
    }

    #[test]
    fn epsilon_decays_to_the_floor() {
        let strategy = QLearningStrategy::new();
        let obs = observation_at(3, 3);
        let agent = obs.self_state.id;
        assert_eq!(strategy.exploration_rate(agent), 1.0);

        let mut rng = StdRng::seed_from_u64(4);
        strategy.decide(&obs, &mut rng);
        assert!((strategy.exploration_rate(agent) - 0.995).abs() < 1e-12);

        for _ in 0..2000 {
            strategy.decide(&obs, &mut rng);
        }
        assert_eq!(strategy.exploration_rate(agent), MIN_EPSILON);
    }

    #[test]
    fn exploration_is_per_agent() {
        let strategy = QLearningStrategy::new();
        let first = observation_at(3, 3);
        let mut second = observation_at(3, 3);
        second.self_state.id = AgentId::from_random_bytes([2; 16]);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..10 {
            strategy.decide(&first, &mut rng);
        }
        assert!(strategy.exploration_rate(first.self_state.id) < 1.0);
        assert_eq!(strategy.exploration_rate(second.self_state.id), 1.0);
    }

    #[test]
    fn agents_learn_from_their_own_history_only() {
        let strategy = QLearningStrategy::new();
        let mut first = observation_at(3, 3);
        let second = {
            let mut obs = observation_at(3, 3);
            obs.self_state.id = AgentId::from_random_bytes([2; 16]);
            obs
        };
        let mut rng = StdRng::seed_from_u64(6);
        strategy.decide(&first, &mut rng);
        first.self_state.hunger += 10.0;
        strategy.decide(&first, &mut rng);
        assert_eq!(strategy.table_len(first.self_state.id), 1);

        strategy.decide(&second, &mut rng);
        assert_eq!(strategy.table_len(second.self_state.id), 0);
        for action in QAction::ALL {
            assert_eq!(strategy.q_value(&second, action), 0.0);
        }
    }

    #[test]
    fn reward_flows_into_the_table() {
        let strategy = QLearningStrategy::new();
        let mut obs = observation_at(3, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let decided = strategy.decide(&obs, &mut rng);
        let action = QAction::of(&decided.action).unwrap();
        let agent = obs.self_state.id;
        assert_eq!(strategy.table_len(agent), 0);

        obs.self_state.hunger += 10.0;
        strategy.decide(&obs, &mut rng);
        assert_eq!(strategy.table_len(agent), 1);
        obs.self_state.hunger -= 10.0;
        assert!((strategy.q_value(&obs, action) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn greedy_choice_follows_learned_values() {
        let strategy = QLearningStrategy::new();
        let mut obs = observation_at(3, 3);
        let here = Position::new(3, 3);
        obs.nearby_resources = vec![resource(1, 3, 3, ResourceType::Food, 5, here)];
        {
            let mut learner = Learner {
                epsilon: 0.0,
                ..Learner::default()
            };
            learner
                .table
                .insert((StateKey::of(&obs), QAction::Gather), 5.0);
            strategy.lock().insert(obs.self_state.id, learner);
        }
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(strategy.decide(&obs, &mut rng).action, ActionParams::Gather);
    }

    #[test]
    fn critical_override_still_tracks_the_transition() {
        let strategy = QLearningStrategy::new();
        let mut obs = observation_at(3, 3);
        obs.self_state.health = 5.0;
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(strategy.decide(&obs, &mut rng).action, ActionParams::Sleep);
        obs.self_state.health = 8.0;
        strategy.decide(&obs, &mut rng);
        obs.self_state.health = 5.0;
        assert!((strategy.q_value(&obs, QAction::Sleep) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn reset_forgets_everything() {
        let strategy = QLearningStrategy::new();
        let obs = observation_at(3, 3);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..5 {
            strategy.decide(&obs, &mut rng);
        }
        strategy.reset();
        assert_eq!(strategy.table_len(obs.self_state.id), 0);
        assert_eq!(strategy.exploration_rate(obs.self_state.id), 1.0);
    }
}
