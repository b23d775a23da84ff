//! Geography and environment rules for the Agora simulation.
//!
//! Everything in this crate is a pure function or a plain data structure:
//! no I/O, no clocks, no shared state.
//!
//! # Modules
//!
//! - [`grid`] -- Bounds, distances, adjacency, radius queries, compass
//!   headings, and greedy single-step pathing.
//! - [`scent`] -- Scent TTL and age-bucketed strength.
//! - [`naming`] -- Location names and usage-count consensus.
//! - [`resource`] -- Spawn regeneration and harvesting.
//! - [`generation`] -- Seeded placement of spawns and shelters.
//! - [`error`] -- Error types.

pub mod error;
pub mod generation;
pub mod grid;
pub mod naming;
pub mod resource;
pub mod scent;

pub use error::WorldError;
pub use generation::{LayoutConfig, WorldLayout, generate_layout};
pub use grid::{
    Axis, adjacent_positions, compass_direction, euclidean_distance, filter_visible,
    greedy_path, is_valid_position, manhattan_distance, next_step, out_of_bounds_axis,
    positions_within_radius, within_radius,
};
pub use naming::{NameRegistry, validate_name};
pub use scent::{ScentSettings, scent_strength, scent_ttl};
