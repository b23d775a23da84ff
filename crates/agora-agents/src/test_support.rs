//! Fixtures shared by unit tests.

use std::collections::BTreeMap;

use agora_types::{Agent, AgentId, AgentStatus, Position};
use rust_decimal::Decimal;

use crate::world_state::WorldState;

/// A healthy agent with id bytes `[n; 16]`, 50 currency and nothing held.
pub fn agent_at(n: u8, x: i32, y: i32) -> Agent {
    Agent {
        id: AgentId::from_random_bytes([n; 16]),
        name: format!("Agent{n}"),
        position: Position::new(x, y),
        hunger: 80.0,
        energy: 100.0,
        health: 100.0,
        balance: Decimal::from(50),
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

/// A 20x20 world at tick 1 holding `agents`.
pub fn world_with(agents: Vec<Agent>) -> WorldState {
    sized_world_with(20, agents)
}

/// A `size`x`size` world at tick 1 holding `agents`.
pub fn sized_world_with(size: i32, agents: Vec<Agent>) -> WorldState {
    let mut world = WorldState::new(size);
    world.tick = 1;
    for agent in agents {
        world.insert_agent(agent);
    }
    world
}
