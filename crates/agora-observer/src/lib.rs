//! Control surface for the Agora simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Control endpoints** (`/api/control/*`) that drive the
//!   [`Scheduler`](agora_core::Scheduler) state machine: start, pause,
//!   resume, stop, reset, and single-step
//! - **Read endpoints** for the scheduler status, the living population,
//!   and the committed event log
//! - **`WebSocket` endpoint** (`/ws/events`) streaming every published
//!   event from the simulation's [`EventBus`](agora_core::EventBus)
//!
//! Reads never hold the tick lock for longer than a world copy, and
//! `WebSocket` clients that fall behind skip ahead instead of slowing the
//! tick loop.

pub mod control;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, spawn_observer, start_server};
pub use state::AppState;
