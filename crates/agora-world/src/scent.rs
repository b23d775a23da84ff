//! Stigmergy rules: how long scent lives and how fresh it reads.
//!
//! Storage is someone else's job (see the scent store interface in
//! `agora-core`). This module only answers two questions, both pure:
//! what TTL a newly left trace gets, and what strength a stored trace has at
//! a given tick. Strength is always recomputed from the live clock, so a
//! coarse store expiry can never make a trace read fresher than it is.

use std::time::Duration;

use agora_types::ScentStrength;
use serde::{Deserialize, Serialize};

/// Age below this percentage of the duration reads as strong.
pub const STRONG_PERCENT: i128 = 30;

/// Age below this percentage of the duration reads as weak.
pub const WEAK_PERCENT: i128 = 70;

/// Shortest TTL ever handed to a store.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Scent configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScentSettings {
    /// How many ticks a trace stays readable. Zero or negative disables
    /// scent entirely.
    pub duration_ticks: i64,
    /// Wall-clock length of one tick.
    pub tick_interval: Duration,
}

impl ScentSettings {
    /// Whether traces should be written at all.
    pub const fn enabled(&self) -> bool {
        self.duration_ticks > 0
    }

    /// TTL for a newly written trace, or `None` when scent is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        scent_ttl(self.duration_ticks, self.tick_interval)
    }

    /// Strength of a trace left at `stored_tick`, read at `current_tick`.
    pub fn strength(&self, current_tick: u64, stored_tick: u64) -> ScentStrength {
        scent_strength(current_tick, stored_tick, self.duration_ticks)
    }
}

/// TTL for a trace: `duration_ticks * tick_interval`, floored at
/// [`MIN_TTL`]. Returns `None` when `duration_ticks` is not positive.
pub fn scent_ttl(duration_ticks: i64, tick_interval: Duration) -> Option<Duration> {
    if duration_ticks <= 0 {
        return None;
    }
    let ticks = u32::try_from(duration_ticks).unwrap_or(u32::MAX);
    Some(tick_interval.saturating_mul(ticks).max(MIN_TTL))
}

/// Whole seconds covering `ttl`, rounded up. Key-value stores that only
/// accept second-granularity expiry use this.
pub fn ttl_whole_seconds(ttl: Duration) -> u64 {
    if ttl.subsec_nanos() > 0 {
        ttl.as_secs().saturating_add(1)
    } else {
        ttl.as_secs().max(1)
    }
}

/// Derived strength of a trace.
///
/// `strong` below 30% of the duration, `weak` below 70%, `faint` otherwise.
/// A negative age (clock reset, or a trace from the future) is `faint`, as is
/// anything read while scent is disabled.
pub fn scent_strength(current_tick: u64, stored_tick: u64, duration_ticks: i64) -> ScentStrength {
    let age = i128::from(current_tick).saturating_sub(i128::from(stored_tick));
    if age < 0 || duration_ticks <= 0 {
        return ScentStrength::Faint;
    }
    let scaled_age = age.saturating_mul(100);
    let duration = i128::from(duration_ticks);
    if scaled_age < duration.saturating_mul(STRONG_PERCENT) {
        ScentStrength::Strong
    } else if scaled_age < duration.saturating_mul(WEAK_PERCENT) {
        ScentStrength::Weak
    } else {
        ScentStrength::Faint
    }
}
