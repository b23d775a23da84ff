//! Regeneration and harvesting for resource spawns.
//!
//! Spawns are never destroyed. Gathering lowers `current_amount`, regen
//! raises it, and neither can push it outside `[0, max_amount]`.

use agora_types::ResourceSpawn;

use crate::error::WorldError;

/// Restore `regen_rate` units, clamped to the spawn's capacity.
///
/// Returns the number of units actually added.
pub fn regenerate(spawn: &mut ResourceSpawn) -> Result<u32, WorldError> {
    if spawn.current_amount >= spawn.max_amount {
        return Ok(0);
    }
    let headroom = spawn
        .max_amount
        .checked_sub(spawn.current_amount)
        .ok_or(WorldError::ArithmeticOverflow)?;
    let added = spawn.regen_rate.min(headroom);
    spawn.current_amount = spawn
        .current_amount
        .checked_add(added)
        .ok_or(WorldError::ArithmeticOverflow)?;
    Ok(added)
}

/// How many of `requested` units a spawn can hand out right now.
pub fn available_harvest(spawn: &ResourceSpawn, requested: u32) -> u32 {
    requested.min(spawn.current_amount)
}

/// Apply a signed adjustment, clamped to `[0, max_amount]`.
///
/// Returns the signed change actually applied.
pub fn adjust(spawn: &mut ResourceSpawn, amount: i64) -> i64 {
    let before = i64::from(spawn.current_amount);
    let target = before
        .saturating_add(amount)
        .clamp(0, i64::from(spawn.max_amount));
    spawn.current_amount = u32::try_from(target).unwrap_or(spawn.max_amount);
    i64::from(spawn.current_amount).saturating_sub(before)
}
