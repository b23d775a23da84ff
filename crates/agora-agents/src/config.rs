//! Tunables for action resolution and needs decay.
//!
//! [`ActionConfig`] covers everything the resolver reads; [`VitalsConfig`]
//! and [`KnowledgeConfig`] cover the per-tick maintenance pass. They
//! deserialize from the `actions`, `vitals` and `knowledge` sections of the
//! simulation config with every field optional.

use std::collections::BTreeMap;

use agora_types::ResourceType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters read by action handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Satiety below which costs are penalised (default: 30).
    pub low_hunger_threshold: f64,
    /// Multiplier applied while satiety is low (default: 1.5).
    pub low_hunger_penalty: f64,
    /// Energy below which costs are penalised (default: 30).
    pub low_energy_threshold: f64,
    /// Multiplier applied while energy is low (default: 1.5).
    pub low_energy_penalty: f64,
    /// Multiplier applied when repeating the previous action (default: 1.2).
    pub consecutive_penalty: f64,

    /// Manhattan range for talking to another agent (default: 5).
    pub communication_range: u32,
    /// Maximum distance for a trade (default: 3).
    pub trade_range: u32,
    /// Reference price of one unit of each item. Unlisted items are worth 1.
    pub item_values: BTreeMap<ResourceType, Decimal>,
    /// Highest trade price as a multiple of the goods' reference value
    /// (default: 2).
    pub trade_price_cap: Decimal,

    /// Units taken per gather (default: 2).
    pub gather_amount: u32,
    /// Satiety restored by one food (default: 30).
    pub food_satiety: f64,
    /// Energy restored by one food (default: 5).
    pub food_energy: f64,
    /// Satiety restored by one water (default: 10).
    pub water_satiety: f64,
    /// Energy restored by one water (default: 10).
    pub water_energy: f64,
    /// Energy restored by sleeping in the open (default: 10).
    pub sleep_recovery: f64,
    /// Recovery multiplier inside a shelter (default: 2.0).
    pub shelter_sleep_bonus: f64,
    /// Currency earned by freelance work (default: 1).
    pub work_wage: Decimal,

    /// Health removed by one harm (default: 15).
    pub harm_damage: f64,
    /// Chance a theft succeeds (default: 0.5).
    pub steal_success_chance: f64,

    /// Importance of a received claim before credibility scaling (default: 0.8).
    pub claim_importance: f64,
    /// Importance of a deceiver's self-record (default: 0.3).
    pub self_record_importance: f64,
    /// Trust shift per point of gossip opinion, before credibility (default: 0.1).
    pub gossip_weight: f64,

    /// Radius of a broadcast signal (default: 5).
    pub signal_radius: u32,
    /// Ticks a signal stays visible (default: 10).
    pub signal_ttl_ticks: u64,
    /// Longest signal message, in characters (default: 200).
    pub max_signal_chars: usize,
    /// Longest credential title, in characters (default: 60).
    pub max_credential_title_chars: usize,

    /// Minimum satiety and energy of both parents (default: 60).
    pub offspring_min_vitals: f64,
    /// Currency the initiating parent hands to the child (default: 10).
    pub offspring_endowment: Decimal,
    /// Energy the partner spends (default: 10).
    pub offspring_partner_energy: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            low_hunger_threshold: 30.0,
            low_hunger_penalty: 1.5,
            low_energy_threshold: 30.0,
            low_energy_penalty: 1.5,
            consecutive_penalty: 1.2,
            communication_range: 5,
            trade_range: 3,
            item_values: BTreeMap::from([
                (ResourceType::Food, Decimal::from(3)),
                (ResourceType::Water, Decimal::TWO),
                (ResourceType::Wood, Decimal::TWO),
                (ResourceType::Stone, Decimal::TWO),
            ]),
            trade_price_cap: Decimal::TWO,
            gather_amount: 2,
            food_satiety: 30.0,
            food_energy: 5.0,
            water_satiety: 10.0,
            water_energy: 10.0,
            sleep_recovery: 10.0,
            shelter_sleep_bonus: 2.0,
            work_wage: Decimal::ONE,
            harm_damage: 15.0,
            steal_success_chance: 0.5,
            claim_importance: 0.8,
            self_record_importance: 0.3,
            gossip_weight: 0.1,
            signal_radius: 5,
            signal_ttl_ticks: 10,
            max_signal_chars: 200,
            max_credential_title_chars: 60,
            offspring_min_vitals: 60.0,
            offspring_endowment: Decimal::TEN,
            offspring_partner_energy: 10.0,
        }
    }
}

impl ActionConfig {
    /// The most a buyer can be charged for `quantity` units of `item`.
    pub fn max_trade_price(&self, item: ResourceType, quantity: u32) -> Decimal {
        let unit = self.item_values.get(&item).copied().unwrap_or(Decimal::ONE);
        unit.checked_mul(Decimal::from(quantity))
            .and_then(|value| value.checked_mul(self.trade_price_cap))
            .unwrap_or(Decimal::MAX)
    }
}

/// Parameters of the per-tick needs decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    /// Satiety lost every tick (default: 1).
    pub hunger_decay: f64,
    /// Energy lost every tick while awake (default: 0.5).
    pub energy_decay: f64,
    /// Health lost per tick at zero satiety (default: 5).
    pub starvation_damage: f64,
    /// Health lost per tick at zero energy (default: 2).
    pub exhaustion_damage: f64,
    /// Satiety and energy above which health regenerates (default: 70).
    pub heal_threshold: f64,
    /// Health regained per tick when well fed and rested (default: 1).
    pub heal_rate: f64,
    /// Memories kept per agent before eviction (default: 50).
    pub memory_capacity: usize,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            hunger_decay: 1.0,
            energy_decay: 0.5,
            starvation_damage: 5.0,
            exhaustion_damage: 2.0,
            heal_threshold: 70.0,
            heal_rate: 1.0,
            memory_capacity: 50,
        }
    }
}

/// Parameters of the social graph upkeep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Manhattan radius within which agents discover each other (default: 2).
    pub discovery_radius: u32,
    /// Records not refreshed for this many ticks are dropped (default: 200).
    pub stale_after_ticks: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            discovery_radius: 2,
            stale_after_ticks: 200,
        }
    }
}
