//! Fresh-world creation.
//!
//! A seeded run always starts from the same world: the layout and the
//! founding agents are both drawn from the run's genesis stream.

use std::collections::BTreeMap;

use agora_agents::WorldState;
use agora_types::{Agent, AgentId, AgentStatus, Personality, Position};
use agora_world::{WorldError, generate_layout};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::info;

use crate::config::SimulationConfig;
use crate::rng::{RngService, RngStream};

/// Starting value of every founding agent's vitals.
const FOUNDER_VITALS: f64 = 100.0;

/// Errors raised while creating a world.
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    /// The layout could not be generated.
    #[error("world generation failed: {0}")]
    World(#[from] WorldError),

    /// More founding agents than cells.
    #[error("cannot place {agents} agents on {cells} cells")]
    Overcrowded {
        /// Agents requested.
        agents: u32,
        /// Cells available.
        cells: u64,
    },
}

/// Build tick 0 of a new run.
///
/// Founding agents land on distinct cells, are named `Agent-1`, `Agent-2`,
/// and so on, and take their decision sources from `world.agent_sources`
/// in round-robin order.
pub fn create_world(
    config: &SimulationConfig,
    rng_service: &RngService,
) -> Result<WorldState, GenesisError> {
    let world_config = &config.world;
    let size = world_config.size;
    let mut rng = rng_service.world_stream(RngStream::Genesis);
    let layout = generate_layout(size, &world_config.layout, &mut rng)?;

    let side = size.unsigned_abs();
    let cells = u64::from(side).saturating_mul(u64::from(side));
    if u64::from(world_config.initial_agents) > cells {
        return Err(GenesisError::Overcrowded {
            agents: world_config.initial_agents,
            cells,
        });
    }

    let mut world = WorldState::new(size);
    world.spawns = layout.spawns.into_iter().map(|s| (s.id, s)).collect();
    world.shelters = layout.shelters.into_iter().map(|s| (s.id, s)).collect();

    let cell_count = usize::try_from(cells).unwrap_or(usize::MAX);
    let founders = usize::try_from(world_config.initial_agents).unwrap_or(usize::MAX);
    let picks = rand::seq::index::sample(&mut rng, cell_count, founders);

    for (n, cell) in picks.into_iter().enumerate() {
        let index = u32::try_from(cell).unwrap_or(0);
        let position = Position::new(
            i32::try_from(index.checked_rem(side).unwrap_or(0)).unwrap_or(0),
            i32::try_from(index.checked_div(side).unwrap_or(0)).unwrap_or(0),
        );
        let source = if world_config.agent_sources.is_empty() {
            config.dispatch.fallback.as_str().to_owned()
        } else {
            let slot = n.checked_rem(world_config.agent_sources.len()).unwrap_or(0);
            world_config
                .agent_sources
                .get(slot)
                .cloned()
                .unwrap_or_default()
        };
        world.insert_agent(Agent {
            id: AgentId::from_random_bytes(rng.random()),
            name: format!("Agent-{}", n.saturating_add(1)),
            position,
            hunger: FOUNDER_VITALS,
            energy: FOUNDER_VITALS,
            health: FOUNDER_VITALS,
            balance: world_config.starting_balance,
            state: AgentStatus::Idle,
            personality: Personality::ALL.choose(&mut rng).copied(),
            decision_source: source,
            inventory: BTreeMap::new(),
            last_action: None,
            born_at_tick: 0,
            generation: 0,
            parents: Vec::new(),
        });
    }

    info!(
        size,
        agents = world.agents.len(),
        spawns = world.spawns.len(),
        shelters = world.shelters.len(),
        seed = rng_service.seed(),
        "World created"
    );
    Ok(world)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn config(size: i32, agents: u32) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.size = size;
        config.world.initial_agents = agents;
        config.world.layout.food_spawns = 2;
        config.world.layout.water_spawns = 1;
        config.world.layout.material_spawns = 0;
        config.world.layout.shelters = 1;
        config.world.agent_sources = vec!["random".to_owned(), "sugarscape".to_owned()];
        config
    }

    #[test]
    fn same_seed_same_world() {
        let config = config(12, 6);
        let a = create_world(&config, &RngService::new(5)).unwrap();
        let b = create_world(&config, &RngService::new(5)).unwrap();
        let c = create_world(&config, &RngService::new(6)).unwrap();
        let ids = |w: &WorldState| w.agents.keys().copied().collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_ne!(ids(&a), ids(&c));
        assert_eq!(a.tick, 0);
    }

    #[test]
    fn founders_are_placed_on_distinct_cells() {
        let config = config(3, 9);
        let world = create_world(&config, &RngService::new(1)).unwrap();
        let cells: BTreeSet<Position> = world.agents.values().map(|a| a.position).collect();
        assert_eq!(cells.len(), 9);
        assert!(cells.iter().all(|p| agora_world::is_valid_position(*p, 3)));
        assert_eq!(world.spawns.len(), 3);
        assert_eq!(world.shelters.len(), 1);
    }

    #[test]
    fn sources_are_assigned_round_robin() {
        let config = config(10, 4);
        let world = create_world(&config, &RngService::new(2)).unwrap();
        let mut by_name: Vec<(&str, &str)> = world
            .agents
            .values()
            .map(|a| (a.name.as_str(), a.decision_source.as_str()))
            .collect();
        by_name.sort_unstable();
        assert_eq!(
            by_name,
            vec![
                ("Agent-1", "random"),
                ("Agent-2", "sugarscape"),
                ("Agent-3", "random"),
                ("Agent-4", "sugarscape"),
            ]
        );
    }

    #[test]
    fn overcrowding_is_rejected() {
        let mut config = config(2, 5);
        config.world.layout.food_spawns = 0;
        config.world.layout.water_spawns = 0;
        config.world.layout.shelters = 0;
        let err = create_world(&config, &RngService::new(2)).unwrap_err();
        assert!(matches!(err, GenesisError::Overcrowded { agents: 5, cells: 4 }));
    }
}
