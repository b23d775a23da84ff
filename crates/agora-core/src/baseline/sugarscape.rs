//! Epstein and Axtell's sugarscape forager.
//!
//! Scores every visible non-empty spawn as `amount * 10 - distance`, breaks
//! ties at random, and either harvests the winner or steps toward it. With
//! nothing in sight it gathers where it stands. The forager has no social
//! behaviour at all.

use agora_types::{ActionParams, Decision, NearbyResource, Observation};
use rand::RngCore;
use rand::seq::IndexedRandom;

use super::{BaselineStrategy, critical_survival, move_toward};

/// Weight of a spawn's amount against its distance.
const AMOUNT_WEIGHT: i64 = 10;

/// Greedy forager.
#[derive(Debug, Clone, Copy, Default)]
pub struct SugarscapeStrategy;

fn score(resource: &NearbyResource) -> i64 {
    i64::from(resource.amount)
        .saturating_mul(AMOUNT_WEIGHT)
        .saturating_sub(i64::from(resource.distance))
}

impl BaselineStrategy for SugarscapeStrategy {
    fn name(&self) -> &'static str {
        "sugarscape"
    }

    fn decide(&self, observation: &Observation, rng: &mut dyn RngCore) -> Decision {
        if let Some(decision) = critical_survival(observation) {
            return decision;
        }

        let visible: Vec<&NearbyResource> = observation
            .nearby_resources
            .iter()
            .filter(|r| r.amount > 0)
            .collect();
        let best = visible.iter().map(|r| score(r)).max();
        let leaders: Vec<&NearbyResource> = visible
            .into_iter()
            .filter(|r| Some(score(r)) == best)
            .collect();

        match leaders.choose(rng) {
            Some(target) if target.distance == 0 => {
                Decision::new(ActionParams::Gather).with_reasoning("harvesting the best cell")
            }
            Some(target) => Decision::new(move_toward(target.position))
                .with_reasoning(format!("heading to {} ({})", target.position, score(target))),
            None => Decision::new(ActionParams::Gather)
                .with_reasoning("nothing in sight, gathering here"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agora_types::{Position, ResourceType};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::baseline::test_support::{observation_at, resource};

    #[test]
    fn amount_outweighs_distance() {
        let mut obs = observation_at(5, 5);
        let here = Position::new(5, 5);
        obs.nearby_resources = vec![
            resource(1, 6, 5, ResourceType::Food, 2, here),
            resource(2, 5, 9, ResourceType::Stone, 3, here),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            SugarscapeStrategy.decide(&obs, &mut rng).action,
            ActionParams::Move { x: 5, y: 9 }
        );
    }

    #[test]
    fn harvests_when_standing_on_the_best() {
        let mut obs = observation_at(5, 5);
        let here = Position::new(5, 5);
        obs.nearby_resources = vec![
            resource(1, 5, 5, ResourceType::Water, 4, here),
            resource(2, 7, 5, ResourceType::Food, 4, here),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(SugarscapeStrategy.decide(&obs, &mut rng).action, ActionParams::Gather);
    }

    #[test]
    fn ties_pick_among_leaders_only() {
        let mut obs = observation_at(5, 5);
        let here = Position::new(5, 5);
        obs.nearby_resources = vec![
            resource(1, 6, 5, ResourceType::Food, 3, here),
            resource(2, 4, 5, ResourceType::Wood, 3, here),
            resource(3, 5, 8, ResourceType::Wood, 1, here),
        ];
        let mut seen = std::collections::BTreeSet::new();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ActionParams::Move { x, y } = SugarscapeStrategy.decide(&obs, &mut rng).action
            else {
                panic!("expected a move");
            };
            assert_eq!(y, 5);
            seen.insert(x);
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![4, 6]);
    }

    #[test]
    fn gathers_in_place_when_nothing_is_visible() {
        let mut obs = observation_at(5, 5);
        let here = Position::new(5, 5);
        obs.nearby_resources = vec![resource(1, 6, 5, ResourceType::Food, 0, here)];
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(SugarscapeStrategy.decide(&obs, &mut rng).action, ActionParams::Gather);
        }
        obs.nearby_resources.clear();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(SugarscapeStrategy.decide(&obs, &mut rng).action, ActionParams::Gather);
    }
}
