//! Data layer for the Agora simulation (`Dragonfly` + `PostgreSQL`).
//!
//! `Dragonfly` holds short-lived scent traces and lets key expiry do the
//! pruning. `PostgreSQL` holds the authoritative world between ticks and the
//! append-only event log. Both are reached only through the store traits in
//! `agora-core`, so the scheduler never knows which backend it runs on.
//!
//! ```text
//! Tick commit
//!     |
//!     +-- world rows + events --> PostgreSQL (PostgresWorldStore, one transaction)
//!     |
//!     +-- scent traces --------> Dragonfly  (DragonflyScentStore, SET .. EX)
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` connection and the scent store
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`event_store`] -- Batch event insertion and querying
//! - [`world_store`] -- Entity rows and the world store
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod event_store;
pub mod postgres;
pub mod world_store;

pub use dragonfly::{DragonflyPool, DragonflyScentStore};
pub use error::DbError;
pub use event_store::{EventRow, EventStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use world_store::{EntityRow, PostgresWorldStore};
