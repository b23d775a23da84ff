//! Tick scheduling, decision dispatch, and orchestration for the Agora
//! simulation.
//!
//! This crate drives the world forward: every tick it builds one
//! observation per living agent, asks each agent's decision source what to
//! do, resolves the answers in agent-id order, runs maintenance, and commits
//! the result.
//!
//! # Modules
//!
//! - [`baseline`] -- Scripted strategies that always produce a valid action.
//! - [`config`] -- Configuration loading from `agora-config.yaml` into
//!   strongly-typed structs.
//! - [`decision`] -- The [`DecisionSource`] trait and [`DecisionError`].
//! - [`dispatch`] -- Bounded concurrent fan-out with deadline and fallback.
//! - [`events`] -- Broadcast bus and in-memory event history.
//! - [`genesis`] -- Seeded creation of a fresh world.
//! - [`observation`] -- Per-agent observation assembly.
//! - [`registry`] -- The shared [`SimulationContext`].
//! - [`rng`] -- Seeded per-(tick, agent) random streams.
//! - [`scheduler`] -- The start/pause/resume/stop state machine.
//! - [`store`] -- Persistence interfaces and in-memory stores.
//! - [`tick`] -- One tick from snapshot to commit.
//!
//! [`DecisionSource`]: decision::DecisionSource
//! [`DecisionError`]: decision::DecisionError
//! [`SimulationContext`]: registry::SimulationContext

pub mod baseline;
pub mod config;
pub mod decision;
pub mod dispatch;
pub mod events;
pub mod genesis;
pub mod observation;
pub mod registry;
pub mod rng;
pub mod scheduler;
pub mod store;
pub mod tick;

pub use config::{ConfigError, SimulationConfig};
pub use decision::{DecisionError, DecisionSource};
pub use events::EventBus;
pub use registry::{ApiKeyStore, SimulationContext};
pub use scheduler::{Scheduler, SchedulerError, SchedulerState, SchedulerStatus};
pub use store::{ScentStore, StoreError, WorldStore};
pub use tick::{TickError, TickSummary};
