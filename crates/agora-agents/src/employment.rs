//! Employment contracts and their escrow.
//!
//! An employer funds the whole salary into escrow when posting a job. Money
//! only ever leaves escrow through [`accept`] (upfront contracts),
//! [`settle`] (per-tick and on-completion contracts), or [`cancel`]. Two
//! invariants hold at every step:
//!
//! - a payout never exceeds the escrow actually held;
//! - `paid_ticks <= ticks_worked` for settled work, so the same worked
//!   duration is never paid twice.
//!
//! Every function here is pure: it takes a contract and returns the updated
//! contract plus the amount that moves.

use agora_types::{AgentId, Employment, EmploymentId, EmploymentStatus, PaymentType, Position};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ActionError;

/// Decimal places kept on per-tick salary shares.
const SALARY_SCALE: u32 = 4;

/// A contract update together with money released to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    /// The updated contract.
    pub employment: Employment,
    /// Amount released from escrow to the worker.
    pub amount: Decimal,
}

/// Post a new job, with the whole salary held in escrow.
pub fn open_offer(
    id: EmploymentId,
    employer: AgentId,
    salary: Decimal,
    ticks_required: u32,
    payment_type: PaymentType,
    position: Position,
    tick: u64,
) -> Result<Employment, ActionError> {
    if salary <= Decimal::ZERO {
        return Err(ActionError::InvalidParameter(
            "salary must be positive".to_owned(),
        ));
    }
    if ticks_required == 0 {
        return Err(ActionError::InvalidParameter(
            "duration must be at least one tick".to_owned(),
        ));
    }
    Ok(Employment {
        id,
        employer,
        worker: None,
        salary,
        ticks_required,
        ticks_worked: 0,
        paid_ticks: 0,
        payment_type,
        escrow_amount: salary,
        status: EmploymentStatus::Offered,
        position,
        created_tick: tick,
    })
}

/// Take an open job. Upfront contracts release the whole escrow here.
pub fn accept(offer: &Employment, worker: AgentId) -> Result<Payout, ActionError> {
    if offer.status != EmploymentStatus::Offered {
        return Err(ActionError::EmploymentUnavailable(format!(
            "contract is {:?}",
            offer.status
        )));
    }
    if offer.employer == worker {
        return Err(ActionError::EmploymentUnavailable(
            "cannot accept your own offer".to_owned(),
        ));
    }

    let mut employment = offer.clone();
    employment.worker = Some(worker);
    employment.status = EmploymentStatus::Active;

    let amount = if employment.payment_type == PaymentType::Upfront {
        let amount = employment.escrow_amount;
        employment.escrow_amount = Decimal::ZERO;
        employment.paid_ticks = employment.ticks_required;
        amount
    } else {
        Decimal::ZERO
    };
    Ok(Payout { employment, amount })
}

/// Count one tick of work. Upfront contracts complete when the last tick is
/// worked, since nothing is left to settle.
pub fn record_work(employment: &Employment) -> Result<Employment, ActionError> {
    if employment.status != EmploymentStatus::Active {
        return Err(ActionError::EmploymentUnavailable(format!(
            "contract is {:?}",
            employment.status
        )));
    }
    if employment.ticks_worked >= employment.ticks_required {
        return Err(ActionError::EmploymentUnavailable(
            "all required ticks already worked".to_owned(),
        ));
    }
    let mut updated = employment.clone();
    updated.ticks_worked = updated.ticks_worked.saturating_add(1);
    if updated.payment_type == PaymentType::Upfront
        && updated.ticks_worked >= updated.ticks_required
    {
        updated.status = EmploymentStatus::Completed;
    }
    Ok(updated)
}

/// Salary currently owed and the number of worked ticks it covers.
///
/// Never more than the escrow held.
pub fn owed(employment: &Employment) -> Result<(Decimal, u32), ActionError> {
    let unpaid_ticks = employment
        .ticks_worked
        .saturating_sub(employment.paid_ticks);
    if unpaid_ticks == 0 {
        return Ok((Decimal::ZERO, 0));
    }

    let amount = match employment.payment_type {
        PaymentType::Upfront => return Ok((Decimal::ZERO, 0)),
        PaymentType::OnCompletion => {
            if employment.ticks_worked < employment.ticks_required {
                return Ok((Decimal::ZERO, 0));
            }
            employment.escrow_amount
        }
        PaymentType::PerTick => {
            let final_payment = employment.paid_ticks.saturating_add(unpaid_ticks)
                >= employment.ticks_required;
            if final_payment {
                // Last settlement takes the remainder so no rounding dust
                // stays in escrow.
                employment.escrow_amount
            } else {
                per_tick_share(employment)?
                    .checked_mul(Decimal::from(unpaid_ticks))
                    .ok_or_else(|| {
                        ActionError::InvalidParameter("salary overflow".to_owned())
                    })?
            }
        }
    };
    Ok((amount.min(employment.escrow_amount), unpaid_ticks))
}

/// Release whatever is owed from escrow.
pub fn settle(employment: &Employment) -> Result<Payout, ActionError> {
    if employment.status != EmploymentStatus::Active {
        return Err(ActionError::EmploymentUnavailable(format!(
            "contract is {:?}",
            employment.status
        )));
    }
    let (amount, ticks) = owed(employment)?;
    if amount <= Decimal::ZERO || ticks == 0 {
        return Err(ActionError::NothingOwed);
    }

    let mut updated = employment.clone();
    updated.escrow_amount = updated
        .escrow_amount
        .checked_sub(amount)
        .filter(|rest| *rest >= Decimal::ZERO)
        .ok_or_else(|| ActionError::Conflict("escrow would go negative".to_owned()))?;
    updated.paid_ticks = updated.paid_ticks.saturating_add(ticks);
    if updated.paid_ticks >= updated.ticks_required && updated.ticks_worked >= updated.ticks_required
    {
        updated.status = EmploymentStatus::Completed;
    }
    Ok(Payout {
        employment: updated,
        amount,
    })
}

/// Close a contract that can no longer be fulfilled. The returned amount is
/// the escrow refunded to the employer.
pub fn cancel(employment: &Employment) -> Payout {
    let mut updated = employment.clone();
    let amount = updated.escrow_amount;
    updated.escrow_amount = Decimal::ZERO;
    updated.status = EmploymentStatus::Cancelled;
    Payout {
        employment: updated,
        amount,
    }
}

/// Salary per worked tick, rounded down to [`SALARY_SCALE`] places.
fn per_tick_share(employment: &Employment) -> Result<Decimal, ActionError> {
    employment
        .salary
        .checked_div(Decimal::from(employment.ticks_required))
        .map(|share| share.round_dp_with_strategy(SALARY_SCALE, RoundingStrategy::ToZero))
        .ok_or_else(|| ActionError::InvalidParameter("duration must be positive".to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn agent(n: u8) -> AgentId {
        AgentId::from_random_bytes([n; 16])
    }

    fn offer(payment_type: PaymentType, salary: Decimal, ticks: u32) -> Employment {
        open_offer(
            EmploymentId::from_random_bytes([5; 16]),
            agent(1),
            salary,
            ticks,
            payment_type,
            Position::new(0, 0),
            1,
        )
        .unwrap()
    }

    fn work(mut employment: Employment, ticks: u32) -> Employment {
        for _ in 0..ticks {
            employment = record_work(&employment).unwrap();
        }
        employment
    }

    #[test]
    fn offer_validation() {
        let bad = open_offer(
            EmploymentId::new(),
            agent(1),
            Decimal::ZERO,
            3,
            PaymentType::PerTick,
            Position::new(0, 0),
            0,
        );
        assert!(bad.is_err());
        let bad = open_offer(
            EmploymentId::new(),
            agent(1),
            dec!(5),
            0,
            PaymentType::PerTick,
            Position::new(0, 0),
            0,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn upfront_pays_everything_on_accept_and_never_again() {
        let job = offer(PaymentType::Upfront, dec!(9), 3);
        let accepted = accept(&job, agent(2)).unwrap();
        assert_eq!(accepted.amount, dec!(9));
        assert_eq!(accepted.employment.escrow_amount, Decimal::ZERO);

        let worked = work(accepted.employment, 3);
        assert_eq!(worked.status, EmploymentStatus::Completed);
        assert_eq!(owed(&worked).unwrap().0, Decimal::ZERO);
    }

    #[test]
    fn cannot_accept_own_or_taken_offer() {
        let job = offer(PaymentType::PerTick, dec!(9), 3);
        assert!(accept(&job, agent(1)).is_err());
        let taken = accept(&job, agent(2)).unwrap().employment;
        assert!(accept(&taken, agent(3)).is_err());
    }

    #[test]
    fn per_tick_pays_shares_then_remainder() {
        let job = offer(PaymentType::PerTick, dec!(10), 3);
        let active = accept(&job, agent(2)).unwrap().employment;

        let first = settle(&work(active, 1)).unwrap();
        assert_eq!(first.amount, dec!(3.3333));
        assert_eq!(first.employment.paid_ticks, 1);

        let second = settle(&work(first.employment, 2)).unwrap();
        assert_eq!(second.amount, dec!(6.6667));
        assert_eq!(second.employment.escrow_amount, Decimal::ZERO);
        assert_eq!(second.employment.status, EmploymentStatus::Completed);
    }

    #[test]
    fn same_work_is_never_paid_twice() {
        let job = offer(PaymentType::PerTick, dec!(10), 5);
        let active = accept(&job, agent(2)).unwrap().employment;
        let paid = settle(&work(active, 2)).unwrap().employment;
        assert_eq!(settle(&paid).unwrap_err(), ActionError::NothingOwed);
    }

    #[test]
    fn on_completion_waits_for_all_ticks() {
        let job = offer(PaymentType::OnCompletion, dec!(7), 2);
        let active = accept(&job, agent(2)).unwrap().employment;
        let halfway = work(active, 1);
        assert_eq!(settle(&halfway).unwrap_err(), ActionError::NothingOwed);

        let done = settle(&work(halfway, 1)).unwrap();
        assert_eq!(done.amount, dec!(7));
        assert_eq!(done.employment.status, EmploymentStatus::Completed);
    }

    #[test]
    fn payout_is_capped_by_escrow_held() {
        let job = offer(PaymentType::OnCompletion, dec!(7), 1);
        let mut active = work(accept(&job, agent(2)).unwrap().employment, 1);
        active.escrow_amount = dec!(2);
        let (amount, _) = owed(&active).unwrap();
        assert_eq!(amount, dec!(2));
    }

    #[test]
    fn work_beyond_requirement_is_rejected() {
        let job = offer(PaymentType::PerTick, dec!(4), 1);
        let active = work(accept(&job, agent(2)).unwrap().employment, 1);
        assert!(record_work(&active).is_err());
    }

    #[test]
    fn cancel_refunds_remaining_escrow() {
        let job = offer(PaymentType::PerTick, dec!(10), 4);
        let refund = cancel(&job);
        assert_eq!(refund.amount, dec!(10));
        assert_eq!(refund.employment.status, EmploymentStatus::Cancelled);
    }
}
