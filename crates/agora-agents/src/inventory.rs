//! Inventory arithmetic. Counts never go negative and zero entries are
//! dropped.

use std::collections::BTreeMap;

use agora_types::ResourceType;

/// Apply signed changes to an inventory.
///
/// Returns the offending item if any count would go negative; the
/// inventory is left untouched in that case.
pub fn apply_changes(
    inventory: &mut BTreeMap<ResourceType, u32>,
    changes: &BTreeMap<ResourceType, i64>,
) -> Result<(), ResourceType> {
    let mut updated = inventory.clone();
    for (item, change) in changes {
        let current = i64::from(updated.get(item).copied().unwrap_or(0));
        let next = current.saturating_add(*change);
        let Ok(next) = u32::try_from(next) else {
            return Err(*item);
        };
        if next == 0 {
            updated.remove(item);
        } else {
            updated.insert(*item, next);
        }
    }
    *inventory = updated;
    Ok(())
}

/// Whether the changes can be applied without going negative.
pub fn can_apply(
    inventory: &BTreeMap<ResourceType, u32>,
    changes: &BTreeMap<ResourceType, i64>,
) -> bool {
    changes.iter().all(|(item, change)| {
        let current = i64::from(inventory.get(item).copied().unwrap_or(0));
        current.saturating_add(*change) >= 0
    })
}

/// Total units held.
pub fn total_items(inventory: &BTreeMap<ResourceType, u32>) -> u64 {
    inventory.values().map(|v| u64::from(*v)).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn changes_apply_and_zero_entries_drop() {
        let mut inventory = BTreeMap::from([(ResourceType::Food, 2)]);
        let changes = BTreeMap::from([(ResourceType::Food, -2), (ResourceType::Wood, 3)]);
        apply_changes(&mut inventory, &changes).unwrap();
        assert_eq!(inventory, BTreeMap::from([(ResourceType::Wood, 3)]));
        assert_eq!(total_items(&inventory), 3);
    }

    #[test]
    fn negative_result_is_rejected_atomically() {
        let mut inventory = BTreeMap::from([(ResourceType::Food, 1)]);
        let changes = BTreeMap::from([(ResourceType::Food, 1), (ResourceType::Stone, -1)]);
        assert!(!can_apply(&inventory, &changes));
        assert_eq!(apply_changes(&mut inventory, &changes), Err(ResourceType::Stone));
        assert_eq!(inventory, BTreeMap::from([(ResourceType::Food, 1)]));
    }
}
