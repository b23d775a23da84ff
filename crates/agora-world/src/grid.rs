//! Pure geometry over the square grid.
//!
//! Coordinates run from `0` to `size - 1` on both axes. `x` grows eastward
//! and `y` grows southward, so "north" means decreasing `y`. Nothing here
//! holds state; every function is a pure computation over positions.
//!
//! Paths are greedy and ignore obstacles: every cell is walkable.

use core::cmp::Ordering;
use core::fmt;

use agora_types::{CompassDirection, Position};

/// One of the two grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Columns.
    X,
    /// Rows.
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
        }
    }
}

/// Whether `position` lies inside a world of side `size`.
pub const fn is_valid_position(position: Position, size: i32) -> bool {
    position.x >= 0 && position.y >= 0 && position.x < size && position.y < size
}

/// The first coordinate of `position` that falls outside `[0, size)`.
///
/// The `x` axis is checked before `y`.
pub const fn out_of_bounds_axis(position: Position, size: i32) -> Option<(Axis, i32)> {
    if position.x < 0 || position.x >= size {
        Some((Axis::X, position.x))
    } else if position.y < 0 || position.y >= size {
        Some((Axis::Y, position.y))
    } else {
        None
    }
}

/// Manhattan (taxicab) distance between two cells.
pub const fn manhattan_distance(a: Position, b: Position) -> u32 {
    a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y))
}

/// Straight-line distance between two cells.
pub fn euclidean_distance(a: Position, b: Position) -> f64 {
    f64::from(a.x.abs_diff(b.x)).hypot(f64::from(a.y.abs_diff(b.y)))
}

/// Whether `position` is within `radius` Manhattan steps of `center`.
pub const fn within_radius(center: Position, position: Position, radius: u32) -> bool {
    manhattan_distance(center, position) <= radius
}

/// The four orthogonal neighbours of `position` that lie inside the world,
/// in north, east, south, west order.
pub fn adjacent_positions(position: Position, size: i32) -> Vec<Position> {
    [(0, -1), (1, 0), (0, 1), (-1, 0)]
        .into_iter()
        .filter_map(|(dx, dy)| {
            let x = position.x.checked_add(dx)?;
            let y = position.y.checked_add(dy)?;
            Some(Position::new(x, y))
        })
        .filter(|p| is_valid_position(*p, size))
        .collect()
}

/// Every in-bounds cell within `radius` Manhattan steps of `center`,
/// including `center` itself, in row-major order.
pub fn positions_within_radius(center: Position, radius: u32, size: i32) -> Vec<Position> {
    let reach = i32::try_from(radius).unwrap_or(i32::MAX).min(size);
    let last = size.saturating_sub(1);
    let min_x = center.x.saturating_sub(reach).max(0);
    let max_x = center.x.saturating_add(reach).min(last);
    let min_y = center.y.saturating_sub(reach).max(0);
    let max_y = center.y.saturating_add(reach).min(last);

    let mut cells = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let cell = Position::new(x, y);
            if within_radius(center, cell, radius) {
                cells.push(cell);
            }
        }
    }
    cells
}

/// Eight-way compass heading from `from` toward `to`, computed with `atan2`.
///
/// Each heading covers a 45 degree sector centred on its axis. Equal
/// positions yield [`CompassDirection::Here`].
pub fn compass_direction(from: Position, to: Position) -> CompassDirection {
    if from == to {
        return CompassDirection::Here;
    }
    let dx = f64::from(to.x) - f64::from(from.x);
    // Screen coordinates: north is toward smaller y.
    let dy_north = f64::from(from.y) - f64::from(to.y);
    let mut degrees = dy_north.atan2(dx).to_degrees();
    if degrees < 0.0 {
        degrees += 360.0;
    }

    if !(22.5..337.5).contains(&degrees) {
        CompassDirection::East
    } else if degrees < 67.5 {
        CompassDirection::NorthEast
    } else if degrees < 112.5 {
        CompassDirection::North
    } else if degrees < 157.5 {
        CompassDirection::NorthWest
    } else if degrees < 202.5 {
        CompassDirection::West
    } else if degrees < 247.5 {
        CompassDirection::SouthWest
    } else if degrees < 292.5 {
        CompassDirection::South
    } else {
        CompassDirection::SouthEast
    }
}

/// The next cell on the greedy path from `from` to `to`.
///
/// The X distance is closed before the Y distance. Returns `None` once the
/// destination is reached.
pub fn next_step(from: Position, to: Position) -> Option<Position> {
    match from.x.cmp(&to.x) {
        Ordering::Less => Some(Position::new(from.x.saturating_add(1), from.y)),
        Ordering::Greater => Some(Position::new(from.x.saturating_sub(1), from.y)),
        Ordering::Equal => match from.y.cmp(&to.y) {
            Ordering::Less => Some(Position::new(from.x, from.y.saturating_add(1))),
            Ordering::Greater => Some(Position::new(from.x, from.y.saturating_sub(1))),
            Ordering::Equal => None,
        },
    }
}

/// The complete greedy path from `from` to `to`, excluding `from` and
/// ending at `to`. Empty when the two are equal.
pub fn greedy_path(from: Position, to: Position) -> Vec<Position> {
    let mut path = Vec::new();
    let mut cursor = from;
    while let Some(next) = next_step(cursor, to) {
        path.push(next);
        cursor = next;
    }
    path
}

/// Keep only the items whose position lies within `radius` of `center`.
pub fn filter_visible<T, F>(
    items: impl IntoIterator<Item = T>,
    center: Position,
    radius: u32,
    position_of: F,
) -> Vec<T>
where
    F: Fn(&T) -> Position,
{
    items
        .into_iter()
        .filter(|item| within_radius(center, position_of(item), radius))
        .collect()
}
