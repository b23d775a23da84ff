//! Agent state, social graph, economy rules, and action resolution for the
//! Agora simulation.
//!
//! This crate is the logic layer between `agora-types` (plain data) and
//! `agora-core` (scheduling and I/O). Nothing in here performs I/O or reads a
//! clock; randomness is always passed in.
//!
//! # Modules
//!
//! - [`actions`] -- Handler catalogue, costs, and the [`ActionResolver`]
//! - [`config`] -- Action, vitals and knowledge tunables
//! - [`employment`] -- Job contracts and escrow
//! - [`error`] -- [`ActionError`] and [`AgentError`]
//! - [`inventory`] -- Inventory arithmetic
//! - [`knowledge`] -- Who knows about whom ([`KnowledgeGraph`])
//! - [`maintenance`] -- End-of-tick upkeep
//! - [`memory`] -- Bounded per-agent memory
//! - [`relationships`] -- Directed trust and credibility
//! - [`vitals`] -- Needs decay and death
//! - [`world_state`] -- The mutable [`WorldState`] and result application

pub mod actions;
pub mod config;
pub mod employment;
pub mod error;
pub mod inventory;
pub mod knowledge;
pub mod maintenance;
pub mod memory;
pub mod relationships;
pub mod vitals;
pub mod world_state;

#[cfg(test)]
pub(crate) mod test_support;

pub use actions::{ActionHandler, ActionResolver, Resolution, ResolutionContext, failure};
pub use config::{ActionConfig, KnowledgeConfig, VitalsConfig};
pub use error::{ActionError, AgentError};
pub use knowledge::{KnowledgeGraph, KnowledgeUpdate, UpsertOutcome};
pub use maintenance::{MaintenanceReport, run_maintenance};
pub use memory::MemoryStore;
pub use relationships::{RelationshipGraph, credibility};
pub use world_state::{Applied, WorldState};
