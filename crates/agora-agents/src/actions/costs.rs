//! Energy and satiety costs per action type.
//!
//! ```text
//! energy = ceil(base_energy * vitals_multiplier * consecutive_multiplier)
//! hunger =      base_hunger * vitals_multiplier * consecutive_multiplier
//! ```
//!
//! The vitals multiplier is the product of one penalty per low vital. The
//! consecutive multiplier applies when the agent repeats its last action.

use agora_types::{ActionType, Agent};

use crate::config::ActionConfig;
use crate::error::ActionError;

/// Base `(energy, hunger)` cost of an action before any multiplier.
#[allow(clippy::match_same_arms)]
pub const fn base_cost(action: ActionType) -> (f64, f64) {
    match action {
        ActionType::Move => (1.0, 0.5),
        ActionType::Gather => (2.0, 1.0),
        ActionType::Eat | ActionType::Sleep | ActionType::Idle => (0.0, 0.0),
        ActionType::Work => (3.0, 1.5),
        ActionType::Trade => (1.0, 0.5),
        ActionType::Harm => (4.0, 2.0),
        ActionType::Steal => (3.0, 1.5),
        ActionType::Deceive
        | ActionType::ShareInfo
        | ActionType::Gossip
        | ActionType::OfferJob
        | ActionType::AcceptJob
        | ActionType::Signal => (1.0, 0.5),
        ActionType::PayWorker
        | ActionType::NameLocation
        | ActionType::IssueCredential
        | ActionType::RevokeCredential => (0.5, 0.0),
        ActionType::Claim => (2.0, 1.0),
        ActionType::SpawnOffspring => (20.0, 10.0),
    }
}

/// A fully computed cost and the factors that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    /// Base energy cost.
    pub base_energy: f64,
    /// Base satiety cost.
    pub base_hunger: f64,
    /// Penalty for low satiety, if it applied.
    pub low_hunger: Option<f64>,
    /// Penalty for low energy, if it applied.
    pub low_energy: Option<f64>,
    /// Penalty for repeating the last action, if it applied.
    pub consecutive: Option<f64>,
    /// Energy charged, rounded up.
    pub energy: f64,
    /// Satiety charged.
    pub hunger: f64,
}

impl Cost {
    /// Product of every vitals penalty that applied.
    pub fn vitals_multiplier(&self) -> f64 {
        self.low_hunger.unwrap_or(1.0) * self.low_energy.unwrap_or(1.0)
    }

    /// Human-readable list of the factors, for errors and event payloads.
    pub fn breakdown(&self) -> String {
        let mut parts = vec![format!("base {}", self.base_energy)];
        if let Some(p) = self.low_hunger {
            parts.push(format!("low hunger x{p}"));
        }
        if let Some(p) = self.low_energy {
            parts.push(format!("low energy x{p}"));
        }
        if let Some(p) = self.consecutive {
            parts.push(format!("repeated action x{p}"));
        }
        parts.join(", ")
    }

    /// Penalty names that applied, for event payloads.
    pub fn penalties(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.low_hunger.is_some() {
            names.push("low_hunger");
        }
        if self.low_energy.is_some() {
            names.push("low_energy");
        }
        if self.consecutive.is_some() {
            names.push("consecutive");
        }
        names
    }
}

/// Compute what `action` costs `agent` right now.
pub fn compute_cost(agent: &Agent, action: ActionType, config: &ActionConfig) -> Cost {
    let (base_energy, base_hunger) = base_cost(action);
    let low_hunger =
        (agent.hunger < config.low_hunger_threshold).then_some(config.low_hunger_penalty);
    let low_energy =
        (agent.energy < config.low_energy_threshold).then_some(config.low_energy_penalty);
    let consecutive = (agent.last_action == Some(action)).then_some(config.consecutive_penalty);

    let multiplier =
        low_hunger.unwrap_or(1.0) * low_energy.unwrap_or(1.0) * consecutive.unwrap_or(1.0);
    Cost {
        base_energy,
        base_hunger,
        low_hunger,
        low_energy,
        consecutive,
        energy: (base_energy * multiplier).ceil(),
        hunger: base_hunger * multiplier,
    }
}

/// Compute the cost and fail if the agent cannot pay the energy.
pub fn affordable_cost(
    agent: &Agent,
    action: ActionType,
    config: &ActionConfig,
) -> Result<Cost, ActionError> {
    let cost = compute_cost(agent, action, config);
    if agent.energy < cost.energy {
        return Err(ActionError::InsufficientEnergy {
            required: cost.energy,
            available: agent.energy,
            breakdown: cost.breakdown(),
        });
    }
    Ok(cost)
}
