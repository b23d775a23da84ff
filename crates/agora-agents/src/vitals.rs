//! Needs decay and the death transition.
//!
//! Runs once per living agent in the maintenance phase of every tick, after
//! all actions are applied. Satiety and energy drain; an agent at zero
//! satiety starves, at zero energy it is exhausted; a well fed and rested
//! agent heals slowly. Health reaching zero makes the agent dead, terminally.

use agora_types::{Agent, AgentStatus, VITAL_MAX, VITAL_MIN};

use crate::config::VitalsConfig;

/// What happened to one agent during needs decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeedsOutcome {
    /// Satiety was at zero and health was lost.
    pub starving: bool,
    /// Energy was at zero and health was lost.
    pub exhausted: bool,
    /// Health reached zero this tick.
    pub died: bool,
}

/// Clamp a vital into `[0, 100]`.
pub const fn clamp_vital(value: f64) -> f64 {
    value.clamp(VITAL_MIN, VITAL_MAX)
}

/// Apply one tick of needs decay. Dead agents are left untouched.
pub fn apply_needs_decay(agent: &mut Agent, config: &VitalsConfig) -> NeedsOutcome {
    let mut outcome = NeedsOutcome::default();
    if !agent.is_alive() {
        return outcome;
    }

    agent.hunger = clamp_vital(agent.hunger - config.hunger_decay);
    // Sleeping agents do not spend energy on being awake.
    if agent.state != AgentStatus::Sleeping {
        agent.energy = clamp_vital(agent.energy - config.energy_decay);
    }

    if agent.hunger <= VITAL_MIN {
        agent.health = clamp_vital(agent.health - config.starvation_damage);
        outcome.starving = true;
    }
    if agent.energy <= VITAL_MIN {
        agent.health = clamp_vital(agent.health - config.exhaustion_damage);
        outcome.exhausted = true;
    }
    if !outcome.starving
        && !outcome.exhausted
        && agent.hunger >= config.heal_threshold
        && agent.energy >= config.heal_threshold
    {
        agent.health = clamp_vital(agent.health + config.heal_rate);
    }

    outcome.died = transition_if_dead(agent);
    outcome
}

/// Move an agent with no health left into the terminal dead state.
///
/// Returns `true` if the transition happened now.
pub fn transition_if_dead(agent: &mut Agent) -> bool {
    if agent.is_alive() && agent.health <= VITAL_MIN {
        agent.health = VITAL_MIN;
        agent.state = AgentStatus::Dead;
        return true;
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::BTreeMap;

    use agora_types::{AgentId, Position};
    use rust_decimal::Decimal;

    use super::*;

    fn agent(hunger: f64, energy: f64, health: f64) -> Agent {
        Agent {
            id: AgentId::from_random_bytes([1; 16]),
            name: "Test".to_owned(),
            position: Position::new(0, 0),
            hunger,
            energy,
            health,
            balance: Decimal::ZERO,
            state: AgentStatus::Idle,
            personality: None,
            decision_source: "random".to_owned(),
            inventory: BTreeMap::new(),
            last_action: None,
            born_at_tick: 0,
            generation: 0,
            parents: Vec::new(),
        }
    }

    #[test]
    fn needs_drain_each_tick() {
        let mut a = agent(50.0, 50.0, 100.0);
        let outcome = apply_needs_decay(&mut a, &VitalsConfig::default());
        assert_eq!(a.hunger, 49.0);
        assert_eq!(a.energy, 49.5);
        assert_eq!(a.health, 100.0);
        assert_eq!(outcome, NeedsOutcome::default());
    }

    #[test]
    fn starvation_costs_health() {
        let mut a = agent(0.5, 50.0, 60.0);
        let outcome = apply_needs_decay(&mut a, &VitalsConfig::default());
        assert!(outcome.starving);
        assert_eq!(a.hunger, 0.0);
        assert_eq!(a.health, 55.0);
    }

    #[test]
    fn sleeping_agents_keep_their_energy() {
        let mut a = agent(50.0, 40.0, 100.0);
        a.state = AgentStatus::Sleeping;
        apply_needs_decay(&mut a, &VitalsConfig::default());
        assert_eq!(a.energy, 40.0);
    }

    #[test]
    fn well_fed_agents_heal() {
        let mut a = agent(90.0, 90.0, 50.0);
        apply_needs_decay(&mut a, &VitalsConfig::default());
        assert_eq!(a.health, 51.0);
    }

    #[test]
    fn death_is_terminal() {
        let mut a = agent(0.0, 0.0, 3.0);
        let outcome = apply_needs_decay(&mut a, &VitalsConfig::default());
        assert!(outcome.died);
        assert_eq!(a.state, AgentStatus::Dead);

        let again = apply_needs_decay(&mut a, &VitalsConfig::default());
        assert!(!again.died);
        assert_eq!(a.state, AgentStatus::Dead);
    }

    #[test]
    fn zero_health_from_combat_transitions() {
        let mut a = agent(80.0, 80.0, 0.0);
        assert!(transition_if_dead(&mut a));
        assert!(!transition_if_dead(&mut a));
    }
}
