//! Seeded placement of resource spawns and shelters on a fresh grid.

use std::collections::BTreeSet;

use agora_types::{Position, ResourceSpawn, ResourceType, Shelter, ShelterId, SpawnId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;

/// How a fresh world is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Number of food spawns.
    pub food_spawns: u32,
    /// Number of water spawns.
    pub water_spawns: u32,
    /// Number of wood and stone spawns, split evenly.
    pub material_spawns: u32,
    /// Number of shelters.
    pub shelters: u32,
    /// Capacity of every spawn.
    pub spawn_capacity: u32,
    /// Regen per tick of every spawn.
    pub regen_rate: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            food_spawns: 12,
            water_spawns: 8,
            material_spawns: 6,
            shelters: 4,
            spawn_capacity: 20,
            regen_rate: 1,
        }
    }
}

/// Spawns and shelters for a fresh world.
#[derive(Debug, Clone, Default)]
pub struct WorldLayout {
    /// Resource spawns.
    pub spawns: Vec<ResourceSpawn>,
    /// Shelters.
    pub shelters: Vec<Shelter>,
}

/// Place spawns and shelters on distinct cells of a `size` x `size` grid.
///
/// Identical seeds produce identical layouts. Spawns start full.
pub fn generate_layout<R: Rng + ?Sized>(
    size: i32,
    config: &LayoutConfig,
    rng: &mut R,
) -> Result<WorldLayout, WorldError> {
    if size <= 0 {
        return Err(WorldError::InvalidWorldSize(size));
    }

    let mut kinds = Vec::new();
    kinds.extend((0..config.food_spawns).map(|_| ResourceType::Food));
    kinds.extend((0..config.water_spawns).map(|_| ResourceType::Water));
    kinds.extend((0..config.material_spawns).map(|i| {
        if i % 2 == 0 {
            ResourceType::Wood
        } else {
            ResourceType::Stone
        }
    }));

    let needed = u64::try_from(kinds.len())
        .ok()
        .and_then(|n| n.checked_add(u64::from(config.shelters)))
        .ok_or(WorldError::ArithmeticOverflow)?;
    let cells = u64::from(size.unsigned_abs()).saturating_mul(u64::from(size.unsigned_abs()));
    if needed > cells {
        return Err(WorldError::InvalidWorldSize(size));
    }

    let mut used = BTreeSet::new();
    let mut layout = WorldLayout::default();

    for resource_type in kinds {
        let position = free_cell(size, &mut used, rng);
        layout.spawns.push(ResourceSpawn {
            id: SpawnId::from_random_bytes(rng.random()),
            position,
            resource_type,
            current_amount: config.spawn_capacity,
            max_amount: config.spawn_capacity,
            regen_rate: config.regen_rate,
        });
    }

    for _ in 0..config.shelters {
        let position = free_cell(size, &mut used, rng);
        layout.shelters.push(Shelter {
            id: ShelterId::from_random_bytes(rng.random()),
            position,
            can_sleep: true,
            owner: None,
        });
    }

    debug!(
        spawns = layout.spawns.len(),
        shelters = layout.shelters.len(),
        size,
        "World layout generated"
    );
    Ok(layout)
}

/// Draw random cells until one is unused. The caller guarantees there is room.
fn free_cell<R: Rng + ?Sized>(size: i32, used: &mut BTreeSet<Position>, rng: &mut R) -> Position {
    loop {
        let candidate = Position::new(rng.random_range(0..size), rng.random_range(0..size));
        if used.insert(candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::grid::is_valid_position;

    #[test]
    fn layout_is_reproducible_per_seed() {
        let config = LayoutConfig::default();
        let a = generate_layout(50, &config, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = generate_layout(50, &config, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.spawns, b.spawns);
        assert_eq!(a.shelters, b.shelters);
    }

    #[test]
    fn every_feature_gets_its_own_cell() {
        let config = LayoutConfig::default();
        let layout = generate_layout(8, &config, &mut StdRng::seed_from_u64(1)).unwrap();
        let cells: BTreeSet<_> = layout
            .spawns
            .iter()
            .map(|s| s.position)
            .chain(layout.shelters.iter().map(|s| s.position))
            .collect();
        assert_eq!(cells.len(), layout.spawns.len() + layout.shelters.len());
        assert!(cells.iter().all(|p| is_valid_position(*p, 8)));
    }

    #[test]
    fn too_small_world_is_rejected() {
        let config = LayoutConfig::default();
        assert!(generate_layout(2, &config, &mut StdRng::seed_from_u64(1)).is_err());
        assert!(generate_layout(0, &config, &mut StdRng::seed_from_u64(1)).is_err());
    }
}
