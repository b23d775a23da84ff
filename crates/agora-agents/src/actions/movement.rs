//! The `move` action.
//!
//! A move names a final destination, but only the first cell of the greedy
//! path (X first, then Y) is walked per tick. The agent re-issues the move on
//! later ticks to keep walking. The cell left behind is marked with a scent.

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, AgentStatus, EventType, Position, WorldEffect,
};
use agora_world::{greedy_path, out_of_bounds_axis};
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext};
use crate::error::ActionError;

/// Handler for `move`.
pub struct MoveHandler;

impl ActionHandler for MoveHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Move
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Move { x, y } = intent.params else {
            return Err(ActionError::InvalidParameter("expected move parameters".to_owned()));
        };
        let destination = Position::new(x, y);
        let size = ctx.world.world_size;
        if let Some((axis, value)) = out_of_bounds_axis(destination, size) {
            return Err(ActionError::InvalidPosition { axis, value, size });
        }
        if destination == agent.position {
            return Err(ActionError::AlreadyAtDestination);
        }

        let cost = affordable_cost(agent, ActionType::Move, ctx.config)?;
        let path = greedy_path(agent.position, destination);
        let step = path.first().copied().ok_or(ActionError::AlreadyAtDestination)?;
        let remaining = path.len().saturating_sub(1);

        let mut resolution = Resolution::charged(&cost);
        resolution.delta.position = Some(step);
        resolution.delta.state = Some(AgentStatus::Walking);
        resolution.effects.push(WorldEffect::LeaveScent {
            position: agent.position,
            agent_id: agent.id,
        });
        resolution.events.push(ctx.event(
            EventType::AgentMoved,
            agent.id,
            json!({
                "from": agent.position,
                "to": step,
                "finalDestination": destination,
                "remainingDistance": remaining,
                "energyCost": cost.energy,
                "hungerCost": cost.hunger,
                "penalties": cost.penalties(),
            }),
        ));
        Ok(resolution)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use agora_types::AgentId;

    use super::*;
    use crate::actions::test_util::{error_of, resolve};
    use crate::test_support::{agent_at, sized_world_with, world_with};
    use crate::world_state::WorldState;

    fn moved(world: &WorldState, agent: &Agent, x: i32, y: i32) -> agora_types::ActionResult {
        resolve(world, agent.id, ActionParams::Move { x, y })
    }

    /// Resolve and apply one move, returning the reported remaining distance.
    fn step_toward(world: &mut WorldState, agent: AgentId, x: i32, y: i32) -> u64 {
        let snapshot = world.clone();
        let params = ActionParams::Move { x, y };
        let result = resolve(&snapshot, agent, params.clone());
        assert!(result.success, "{:?}", result.error);
        let intent = ActionIntent::new(agent, params, world.tick);
        world.apply_result(&intent, &result, &snapshot, 10).unwrap();
        result.events.first().unwrap().payload["remainingDistance"]
            .as_u64()
            .unwrap()
    }

    #[test]
    fn adjacent_move_in_a_large_world() {
        let a = agent_at(1, 50, 50);
        let mut world = sized_world_with(100, vec![a.clone()]);
        assert_eq!(step_toward(&mut world, a.id, 51, 50), 0);
        let after = world.agent(a.id).unwrap();
        assert_eq!(after.position, Position::new(51, 50));
        assert_eq!(after.energy, 99.0);
    }

    #[test]
    fn five_cells_east_leaves_four_to_go() {
        let a = agent_at(1, 50, 50);
        let mut world = sized_world_with(100, vec![a.clone()]);
        assert_eq!(step_toward(&mut world, a.id, 55, 50), 4);
        assert_eq!(world.agent(a.id).unwrap().position, Position::new(51, 50));
    }

    #[test]
    fn repeated_moves_count_down_to_arrival() {
        let a = agent_at(1, 50, 50);
        let mut world = sized_world_with(100, vec![a.clone()]);
        let mut path = Vec::new();
        for expected in (0..10).rev() {
            assert_eq!(step_toward(&mut world, a.id, 56, 54), expected);
            path.push(world.agent(a.id).unwrap().position);
        }
        let xs_first: Vec<Position> = (51..=56)
            .map(|x| Position::new(x, 50))
            .chain((51..=54).map(|y| Position::new(56, y)))
            .collect();
        assert_eq!(path, xs_first);
        assert_eq!(error_of(&moved(&world, &a, 56, 54)), "Already at destination");
    }

    #[test]
    fn single_step_to_adjacent_cell() {
        let a = agent_at(1, 5, 5);
        let mut world = world_with(vec![a.clone()]);
        let result = moved(&world, &a, 6, 5);
        assert!(result.success);

        let snapshot = world.clone();
        let intent = ActionIntent::new(a.id, ActionParams::Move { x: 6, y: 5 }, 1);
        let applied = world.apply_result(&intent, &result, &snapshot, 10).unwrap();
        let after = world.agent(a.id).unwrap();
        assert_eq!(after.position, Position::new(6, 5));
        assert_eq!(after.energy, 99.0);
        assert_eq!(after.state, AgentStatus::Walking);
        assert_eq!(applied.scents.first().unwrap().position, Position::new(5, 5));

        assert_eq!(result.events.len(), 1);
        let event = result.events.first().unwrap();
        assert_eq!(event.event_type, EventType::AgentMoved);
        assert_eq!(event.payload["remainingDistance"], 0);
    }

    #[test]
    fn long_move_walks_x_before_y() {
        let a = agent_at(1, 0, 0);
        let world = world_with(vec![a.clone()]);
        let result = moved(&world, &a, 3, 2);
        let delta = result.delta.unwrap();
        assert_eq!(delta.position, Some(Position::new(1, 0)));

        let event = result.events.first().unwrap();
        assert_eq!(event.payload["remainingDistance"], 4);
        assert_eq!(event.payload["finalDestination"]["x"], 3);
        assert_eq!(event.payload["finalDestination"]["y"], 2);
    }

    #[test]
    fn out_of_bounds_names_the_axis() {
        let a = agent_at(1, 0, 0);
        let world = world_with(vec![a.clone()]);
        assert_eq!(
            error_of(&moved(&world, &a, 20, 3)),
            "Invalid position: x=20 is outside the world (0..20)"
        );
        assert_eq!(
            error_of(&moved(&world, &a, 3, -1)),
            "Invalid position: y=-1 is outside the world (0..20)"
        );
    }

    #[test]
    fn moving_to_current_cell_fails() {
        let a = agent_at(1, 4, 4);
        let world = world_with(vec![a.clone()]);
        assert_eq!(error_of(&moved(&world, &a, 4, 4)), "Already at destination");
    }

    #[test]
    fn exhausted_agent_cannot_move() {
        let mut a = agent_at(1, 4, 4);
        a.energy = 0.0;
        let world = world_with(vec![a.clone()]);
        let error = error_of(&moved(&world, &a, 5, 4));
        assert!(error.starts_with("Insufficient energy"));
    }

    #[test]
    fn failed_move_emits_action_failed() {
        let a = agent_at(1, 4, 4);
        let world = world_with(vec![a.clone()]);
        let result = moved(&world, &a, 4, 4);
        assert_eq!(
            result.events.first().unwrap().event_type,
            EventType::ActionFailed
        );
        assert!(result.delta.is_none());
    }
}
