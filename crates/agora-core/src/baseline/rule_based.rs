//! Survival-first priority ladder.
//!
//! Each rung either fires and returns a decision or falls through to the
//! next. The ladder never looks at other agents: it is the fallback of last
//! resort and must be cheap and predictable.

use agora_types::{ActionParams, Decision, Observation};
use rand::RngCore;

use super::{BaselineStrategy, critical_survival, move_toward, nearest_resource, richest_resource};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Satiety below which finding food preempts everything but critical health.
const CRITICAL_HUNGER: f64 = 15.0;

/// Energy below which the agent sleeps immediately.
const CRITICAL_ENERGY: f64 = 15.0;

/// Satiety below which the agent goes looking for food.
const LOW_HUNGER: f64 = 40.0;

/// Energy below which the agent sleeps when nothing is more urgent.
const LOW_ENERGY: f64 = 30.0;

/// Balance below which the agent works instead of exploring.
const LOW_BALANCE: i64 = 5;

/// Deterministic rule ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedStrategy;

impl RuleBasedStrategy {
    /// Eat if possible, else gather food here, else walk to the nearest food.
    fn seek_food(observation: &Observation, why: &str) -> Option<Decision> {
        if let Some(item) = observation.best_food() {
            return Some(
                Decision::new(ActionParams::Eat { item }).with_reasoning(format!("{why}, eating")),
            );
        }
        if observation
            .resource_here()
            .is_some_and(|r| r.resource_type.is_consumable())
        {
            return Some(
                Decision::new(ActionParams::Gather)
                    .with_reasoning(format!("{why}, gathering food here")),
            );
        }
        nearest_resource(observation, |r| r.resource_type.is_consumable()).map(|r| {
            Decision::new(move_toward(r.position))
                .with_reasoning(format!("{why}, heading to food at {}", r.position))
        })
    }
}

impl BaselineStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    fn decide(&self, observation: &Observation, _rng: &mut dyn RngCore) -> Decision {
        if let Some(decision) = critical_survival(observation) {
            return decision;
        }
        let me = &observation.self_state;

        if me.hunger < CRITICAL_HUNGER
            && let Some(decision) = Self::seek_food(observation, "starving")
        {
            return decision;
        }
        if me.energy < CRITICAL_ENERGY {
            return Decision::new(ActionParams::Sleep).with_reasoning("exhausted");
        }
        if me.hunger < LOW_HUNGER
            && let Some(decision) = Self::seek_food(observation, "hungry")
        {
            return decision;
        }
        if me.energy < LOW_ENERGY {
            return Decision::new(ActionParams::Sleep).with_reasoning("tired");
        }
        if observation.resource_here().is_some() {
            return Decision::new(ActionParams::Gather).with_reasoning("resource underfoot");
        }
        if me.balance < rust_decimal::Decimal::from(LOW_BALANCE) {
            return Decision::new(ActionParams::Work).with_reasoning("low on currency");
        }
        if let Some(target) = richest_resource(observation, |_| true) {
            return Decision::new(move_toward(target.position))
                .with_reasoning(format!("exploring toward {}", target.position));
        }
        Decision::new(ActionParams::Idle).with_reasoning("nothing to do")
    }
}
