//! Economic actions: `trade`, `offer_job`, `accept_job`, `pay_worker`.
//!
//! Trades move items one way and currency the other in a single result, so
//! both sides change together or not at all. The buyer never pays more than
//! the reference value of the goods times the configured cap. Jobs run on
//! the escrow rules in [`crate::employment`].

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, AgentDelta, EmploymentId, EmploymentStatus,
    EventType, WorldEffect,
};
use agora_world::manhattan_distance;
use rust_decimal::Decimal;
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext};
use crate::employment;
use crate::error::ActionError;

/// Trust each side gains from a completed trade.
const TRADE_TRUST: f64 = 2.0;

/// Handler for `trade`: sell `quantity` of `item` to `target` for `price`.
pub struct TradeHandler;

impl ActionHandler for TradeHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Trade
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::Trade {
            target,
            item,
            quantity,
            price,
        } = &intent.params
        else {
            return Err(ActionError::InvalidParameter("expected trade parameters".to_owned()));
        };
        let (item, quantity, price) = (*item, *quantity, *price);
        let partner = ctx.living_target(agent, *target)?;

        let distance = manhattan_distance(agent.position, partner.position);
        if distance == 0 {
            return Err(ActionError::InvalidParameter(
                "cannot trade with an agent on your own cell".to_owned(),
            ));
        }
        if distance > ctx.config.trade_range {
            return Err(ActionError::OutOfRange {
                distance,
                range: ctx.config.trade_range,
            });
        }
        if quantity == 0 {
            return Err(ActionError::InvalidParameter("quantity must be at least 1".to_owned()));
        }
        if price < Decimal::ZERO {
            return Err(ActionError::InvalidParameter("price cannot be negative".to_owned()));
        }
        let ceiling = ctx.config.max_trade_price(item, quantity);
        if price > ceiling {
            return Err(ActionError::PriceTooHigh { price, ceiling });
        }
        let held = agent.item_count(item);
        if held < quantity {
            return Err(ActionError::ItemNotHeld {
                item,
                requested: quantity,
                held,
            });
        }
        if partner.balance < price {
            return Err(ActionError::InsufficientFunds {
                required: price,
                available: partner.balance,
            });
        }
        let cost = affordable_cost(agent, ActionType::Trade, ctx.config)?;

        let mut resolution = Resolution::charged(&cost);
        resolution.delta.add_item(item, -i64::from(quantity));
        resolution.delta.balance = price;

        let mut partner_delta = AgentDelta {
            balance: -price,
            ..AgentDelta::default()
        };
        partner_delta.add_item(item, i64::from(quantity));
        resolution.effects.extend([
            WorldEffect::AdjustAgent {
                agent_id: partner.id,
                delta: partner_delta,
            },
            WorldEffect::AdjustTrust {
                from: agent.id,
                to: partner.id,
                amount: TRADE_TRUST,
            },
            WorldEffect::AdjustTrust {
                from: partner.id,
                to: agent.id,
                amount: TRADE_TRUST,
            },
        ]);
        resolution.events.push(ctx.event(
            EventType::TradeCompleted,
            agent.id,
            json!({
                "buyer": partner.id,
                "item": item,
                "quantity": quantity,
                "price": price,
            }),
        ));
        Ok(resolution)
    }
}

/// Handler for `offer_job`. The salary moves into escrow immediately.
pub struct OfferJobHandler;

impl ActionHandler for OfferJobHandler {
    fn action_type(&self) -> ActionType {
        ActionType::OfferJob
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::OfferJob {
            salary,
            duration_ticks,
            payment_type,
        } = intent.params
        else {
            return Err(ActionError::InvalidParameter(
                "expected offer_job parameters".to_owned(),
            ));
        };
        if agent.balance < salary {
            return Err(ActionError::InsufficientFunds {
                required: salary,
                available: agent.balance,
            });
        }
        let cost = affordable_cost(agent, ActionType::OfferJob, ctx.config)?;
        let offer = employment::open_offer(
            EmploymentId::from_random_bytes(ctx.id_bytes()),
            agent.id,
            salary,
            duration_ticks,
            payment_type,
            agent.position,
            ctx.tick,
        )?;

        let mut resolution = Resolution::charged(&cost);
        resolution.delta.balance = -salary;
        resolution.events.push(ctx.event(
            EventType::JobOffered,
            agent.id,
            json!({
                "employmentId": offer.id,
                "salary": salary,
                "durationTicks": duration_ticks,
                "paymentType": payment_type,
            }),
        ));
        resolution
            .effects
            .push(WorldEffect::UpsertEmployment { employment: offer });
        Ok(resolution)
    }
}

/// Handler for `accept_job`.
pub struct AcceptJobHandler;

impl ActionHandler for AcceptJobHandler {
    fn action_type(&self) -> ActionType {
        ActionType::AcceptJob
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::AcceptJob { employment_id } = intent.params else {
            return Err(ActionError::InvalidParameter(
                "expected accept_job parameters".to_owned(),
            ));
        };
        let offer = ctx
            .world
            .employments
            .get(&employment_id)
            .ok_or(ActionError::EmploymentNotFound(employment_id))?;
        let employer_alive = ctx
            .world
            .agent(offer.employer)
            .is_some_and(Agent::is_alive);
        if !employer_alive {
            return Err(ActionError::EmploymentUnavailable(
                "the employer is dead".to_owned(),
            ));
        }
        if ctx.world.active_job_of(agent.id).is_some() {
            return Err(ActionError::EmploymentUnavailable(
                "you already have an active job".to_owned(),
            ));
        }
        let cost = affordable_cost(agent, ActionType::AcceptJob, ctx.config)?;
        let payout = employment::accept(offer, agent.id)?;

        let mut resolution = Resolution::charged(&cost);
        resolution.delta.balance = payout.amount;
        resolution.events.push(ctx.event(
            EventType::JobAccepted,
            agent.id,
            json!({
                "employmentId": employment_id,
                "employer": offer.employer,
                "upfrontPaid": payout.amount,
            }),
        ));
        resolution.effects.push(WorldEffect::UpsertEmployment {
            employment: payout.employment,
        });
        Ok(resolution)
    }
}

/// Handler for `pay_worker`: the employer settles what is owed.
pub struct PayWorkerHandler;

impl ActionHandler for PayWorkerHandler {
    fn action_type(&self) -> ActionType {
        ActionType::PayWorker
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::PayWorker { employment_id } = intent.params else {
            return Err(ActionError::InvalidParameter(
                "expected pay_worker parameters".to_owned(),
            ));
        };
        let contract = ctx
            .world
            .employments
            .get(&employment_id)
            .ok_or(ActionError::EmploymentNotFound(employment_id))?;
        if contract.employer != agent.id {
            return Err(ActionError::NotEmployer);
        }
        let worker = contract.worker.ok_or_else(|| {
            ActionError::EmploymentUnavailable("nobody has accepted this job".to_owned())
        })?;
        if contract.status != EmploymentStatus::Active {
            return Err(ActionError::EmploymentUnavailable(format!(
                "contract is {:?}",
                contract.status
            )));
        }
        let cost = affordable_cost(agent, ActionType::PayWorker, ctx.config)?;
        let payout = employment::settle(contract)?;

        let mut resolution = Resolution::charged(&cost);
        resolution.events.push(ctx.event(
            EventType::WorkerPaid,
            agent.id,
            json!({
                "employmentId": employment_id,
                "worker": worker,
                "amount": payout.amount,
                "paidTicks": payout.employment.paid_ticks,
                "escrowRemaining": payout.employment.escrow_amount,
            }),
        ));
        resolution.effects.extend([
            WorldEffect::AdjustAgent {
                agent_id: worker,
                delta: AgentDelta {
                    balance: payout.amount,
                    ..AgentDelta::default()
                },
            },
            WorldEffect::UpsertEmployment {
                employment: payout.employment,
            },
        ]);
        Ok(resolution)
    }
}
