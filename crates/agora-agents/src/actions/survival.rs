//! Survival actions: `gather`, `eat`, `sleep`, `work`, `idle`.

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, AgentStatus, EventType,
    PaymentType, ResourceType, VITAL_MAX, WorldEffect,
};
use agora_world::resource;
use rust_decimal::Decimal;
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext};
use crate::employment;
use crate::error::ActionError;

/// Handler for `gather`.
pub struct GatherHandler;

impl ActionHandler for GatherHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Gather
    }

    fn resolve(
        &self,
        _intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let spawn = ctx
            .world
            .spawn_at(agent.position)
            .ok_or(ActionError::NoResourceHere)?;
        let taken = resource::available_harvest(spawn, ctx.config.gather_amount);
        if taken == 0 {
            return Err(ActionError::ResourceDepleted);
        }
        let cost = affordable_cost(agent, ActionType::Gather, ctx.config)?;

        let mut resolution = Resolution::charged(&cost);
        resolution
            .delta
            .add_item(spawn.resource_type, i64::from(taken));
        resolution.effects.push(WorldEffect::AdjustSpawn {
            spawn_id: spawn.id,
            amount: -i64::from(taken),
        });
        resolution.events.push(ctx.event(
            EventType::ResourceGathered,
            agent.id,
            json!({
                "resource": spawn.resource_type,
                "amount": taken,
                "spawnId": spawn.id,
                "position": agent.position,
                "remaining": spawn.current_amount.saturating_sub(taken),
            }),
        ));
        Ok(resolution)
    }
}

/// Handler for `eat`.
pub struct EatHandler;

impl EatHandler {
    /// Satiety and energy restored by one unit of `item`.
    fn nourishment(item: ResourceType, ctx: &ResolutionContext<'_>) -> Option<(f64, f64)> {
        match item {
            ResourceType::Food => Some((ctx.config.food_satiety, ctx.config.food_energy)),
            ResourceType::Water => Some((ctx.config.water_satiety, ctx.config.water_energy)),
            ResourceType::Wood | ResourceType::Stone => None,
        }
    }
}

impl ActionHandler for EatHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Eat
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Eat { item } = intent.params else {
            return Err(ActionError::InvalidParameter("expected eat parameters".to_owned()));
        };
        let (satiety, energy) =
            Self::nourishment(item, ctx).ok_or(ActionError::NotConsumable(item))?;
        let held = agent.item_count(item);
        if held == 0 {
            return Err(ActionError::ItemNotHeld {
                item,
                requested: 1,
                held,
            });
        }
        let cost = affordable_cost(agent, ActionType::Eat, ctx.config)?;

        let mut resolution = Resolution::charged(&cost);
        resolution.delta.hunger += satiety;
        resolution.delta.energy += energy;
        resolution.delta.add_item(item, -1);
        resolution.delta.state = Some(AgentStatus::Idle);
        resolution.events.push(ctx.event(
            EventType::AgentAte,
            agent.id,
            json!({
                "item": item,
                "satiety": satiety,
                "energy": energy,
                "hungerAfter": (agent.hunger + satiety).min(VITAL_MAX),
            }),
        ));
        Ok(resolution)
    }
}

/// Handler for `sleep`. Sleeping in a shelter recovers more.
pub struct SleepHandler;

impl ActionHandler for SleepHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Sleep
    }

    fn resolve(
        &self,
        _intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let cost = affordable_cost(agent, ActionType::Sleep, ctx.config)?;
        let sheltered = ctx
            .world
            .shelter_at(agent.position)
            .is_some_and(|s| s.can_sleep);
        let recovered = if sheltered {
            ctx.config.sleep_recovery * ctx.config.shelter_sleep_bonus
        } else {
            ctx.config.sleep_recovery
        };

        let mut resolution = Resolution::charged(&cost);
        resolution.delta.energy += recovered;
        resolution.delta.state = Some(AgentStatus::Sleeping);
        resolution.events.push(ctx.event(
            EventType::AgentSlept,
            agent.id,
            json!({ "recovered": recovered, "sheltered": sheltered }),
        ));
        Ok(resolution)
    }
}

/// Handler for `work`.
///
/// An employed agent works its contract: the worked tick is counted and
/// per-tick contracts pay out immediately from escrow. Anyone else earns the
/// freelance wage.
pub struct WorkHandler;

impl ActionHandler for WorkHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Work
    }

    fn resolve(
        &self,
        _intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let cost = affordable_cost(agent, ActionType::Work, ctx.config)?;
        let mut resolution = Resolution::charged(&cost);
        resolution.delta.state = Some(AgentStatus::Working);

        let Some(job) = ctx.world.job_with_work_left(agent.id) else {
            resolution.delta.balance = ctx.config.work_wage;
            resolution.events.push(ctx.event(
                EventType::AgentWorked,
                agent.id,
                json!({ "wage": ctx.config.work_wage, "employmentId": null }),
            ));
            return Ok(resolution);
        };

        let mut contract = employment::record_work(job)?;
        let mut paid = Decimal::ZERO;
        if contract.payment_type == PaymentType::PerTick {
            let payout = employment::settle(&contract)?;
            paid = payout.amount;
            contract = payout.employment;
        }
        resolution.delta.balance = paid;
        resolution.events.push(ctx.event(
            EventType::AgentWorked,
            agent.id,
            json!({
                "wage": paid,
                "employmentId": contract.id,
                "employer": contract.employer,
                "ticksWorked": contract.ticks_worked,
                "ticksRequired": contract.ticks_required,
                "status": contract.status,
            }),
        ));
        resolution
            .effects
            .push(WorldEffect::UpsertEmployment { employment: contract });
        Ok(resolution)
    }
}

/// Handler for `idle`. Always succeeds and costs nothing.
pub struct IdleHandler;

impl ActionHandler for IdleHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Idle
    }

    fn resolve(
        &self,
        _intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let mut resolution = Resolution::default();
        if agent.state != AgentStatus::Idle {
            resolution.delta.state = Some(AgentStatus::Idle);
        }
        resolution
            .events
            .push(ctx.event(EventType::AgentIdled, agent.id, json!({})));
        Ok(resolution)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use agora_types::{
        EmploymentId, EmploymentStatus, Position, ResourceSpawn, Shelter, ShelterId, SpawnId,
    };
    use rust_decimal_macros::dec;

    use super::*;
    use crate::actions::test_util::{error_of, resolve};
    use crate::test_support::{agent_at, world_with};

    fn spawn_at(x: i32, y: i32, amount: u32) -> ResourceSpawn {
        ResourceSpawn {
            id: SpawnId::from_random_bytes([8; 16]),
            position: Position::new(x, y),
            resource_type: ResourceType::Food,
            current_amount: amount,
            max_amount: 20,
            regen_rate: 1,
        }
    }

    #[test]
    fn gather_takes_up_to_the_configured_amount() {
        let a = agent_at(1, 3, 3);
        let mut world = world_with(vec![a.clone()]);
        let spawn = spawn_at(3, 3, 1);
        world.spawns.insert(spawn.id, spawn.clone());

        let result = resolve(&world, a.id, ActionParams::Gather);
        let delta = result.delta.unwrap();
        assert_eq!(delta.inventory.get(&ResourceType::Food), Some(&1));
        assert_eq!(delta.energy, -2.0);
        assert_eq!(
            result.effects,
            vec![WorldEffect::AdjustSpawn {
                spawn_id: spawn.id,
                amount: -1
            }]
        );
    }

    #[test]
    fn gather_needs_a_stocked_spawn() {
        let a = agent_at(1, 3, 3);
        let mut world = world_with(vec![a.clone()]);
        assert_eq!(
            error_of(&resolve(&world, a.id, ActionParams::Gather)),
            "No resource spawn at the current position"
        );
        let spawn = spawn_at(3, 3, 0);
        world.spawns.insert(spawn.id, spawn);
        assert_eq!(
            error_of(&resolve(&world, a.id, ActionParams::Gather)),
            "Resource spawn is depleted"
        );
    }

    #[test]
    fn eating_restores_satiety_and_consumes_the_item() {
        let mut a = agent_at(1, 0, 0);
        a.inventory.insert(ResourceType::Food, 2);
        let world = world_with(vec![a.clone()]);
        let result = resolve(&world, a.id, ActionParams::Eat { item: ResourceType::Food });
        let delta = result.delta.unwrap();
        assert_eq!(delta.hunger, 30.0);
        assert_eq!(delta.energy, 5.0);
        assert_eq!(delta.inventory.get(&ResourceType::Food), Some(&-1));
    }

    #[test]
    fn cannot_eat_stone_or_missing_food() {
        let mut a = agent_at(1, 0, 0);
        a.inventory.insert(ResourceType::Stone, 1);
        let world = world_with(vec![a.clone()]);
        assert_eq!(
            error_of(&resolve(&world, a.id, ActionParams::Eat { item: ResourceType::Stone })),
            "Stone is not edible"
        );
        assert_eq!(
            error_of(&resolve(&world, a.id, ActionParams::Eat { item: ResourceType::Water })),
            "Not enough Water: need 1, have 0"
        );
    }

    #[test]
    fn shelter_doubles_sleep_recovery() {
        let a = agent_at(1, 2, 2);
        let b = agent_at(2, 9, 9);
        let mut world = world_with(vec![a.clone(), b.clone()]);
        let shelter = Shelter {
            id: ShelterId::from_random_bytes([3; 16]),
            position: Position::new(2, 2),
            can_sleep: true,
            owner: None,
        };
        world.shelters.insert(shelter.id, shelter);

        let inside = resolve(&world, a.id, ActionParams::Sleep).delta.unwrap();
        let outside = resolve(&world, b.id, ActionParams::Sleep).delta.unwrap();
        assert_eq!(inside.energy, 20.0);
        assert_eq!(outside.energy, 10.0);
        assert_eq!(inside.state, Some(AgentStatus::Sleeping));
    }

    #[test]
    fn freelance_work_pays_the_wage() {
        let a = agent_at(1, 0, 0);
        let world = world_with(vec![a.clone()]);
        let delta = resolve(&world, a.id, ActionParams::Work).delta.unwrap();
        assert_eq!(delta.balance, Decimal::ONE);
        assert_eq!(delta.state, Some(AgentStatus::Working));
    }

    #[test]
    fn employed_work_is_paid_from_escrow() {
        let boss = agent_at(1, 0, 0);
        let worker = agent_at(2, 0, 0);
        let mut world = world_with(vec![boss.clone(), worker.clone()]);
        let offer = employment::open_offer(
            EmploymentId::from_random_bytes([6; 16]),
            boss.id,
            dec!(10),
            2,
            PaymentType::PerTick,
            Position::new(0, 0),
            0,
        )
        .unwrap();
        let active = employment::accept(&offer, worker.id).unwrap().employment;
        world.employments.insert(active.id, active);

        let result = resolve(&world, worker.id, ActionParams::Work);
        assert_eq!(result.delta.unwrap().balance, dec!(5));
        let Some(WorldEffect::UpsertEmployment { employment }) = result.effects.first() else {
            panic!("expected an employment update");
        };
        assert_eq!(employment.ticks_worked, 1);
        assert_eq!(employment.paid_ticks, 1);
        assert_eq!(employment.escrow_amount, dec!(5));
        assert_eq!(employment.status, EmploymentStatus::Active);
    }

    #[test]
    fn finished_contracts_fall_back_to_freelance_work() {
        let boss = agent_at(1, 0, 0);
        let worker = agent_at(2, 0, 0);
        let mut world = world_with(vec![boss.clone(), worker.clone()]);
        let offer = employment::open_offer(
            EmploymentId::from_random_bytes([7; 16]),
            boss.id,
            dec!(10),
            1,
            PaymentType::OnCompletion,
            Position::new(0, 0),
            0,
        )
        .unwrap();
        let mut active = employment::accept(&offer, worker.id).unwrap().employment;
        active = employment::record_work(&active).unwrap();
        assert_eq!(active.status, EmploymentStatus::Active);
        world.employments.insert(active.id, active.clone());

        let result = resolve(&world, worker.id, ActionParams::Work);
        assert!(result.success);
        assert_eq!(result.delta.unwrap().balance, Decimal::ONE);
        assert!(result.effects.is_empty());
        assert_eq!(world.active_job_of(worker.id).map(|e| e.id), Some(active.id));
    }

    #[test]
    fn idle_always_succeeds() {
        let mut a = agent_at(1, 0, 0);
        a.energy = 0.0;
        let world = world_with(vec![a.clone()]);
        let result = resolve(&world, a.id, ActionParams::Idle);
        assert!(result.success);
        assert_eq!(
            result.events.first().unwrap().event_type,
            EventType::AgentIdled
        );
    }
}
