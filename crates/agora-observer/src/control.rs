//! Control endpoints for the tick scheduler.
//!
//! These are the only write paths into a running simulation. Each maps to
//! one scheduler operation; an operation the current state does not allow
//! answers `409 Conflict` and changes nothing.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/control/start` | Start the tick loop |
//! | `POST` | `/api/control/pause` | Park the loop after the tick in flight |
//! | `POST` | `/api/control/resume` | Resume a paused loop |
//! | `POST` | `/api/control/stop` | Stop the loop and wait for it |
//! | `POST` | `/api/control/reset` | Replace the world with a fresh genesis |
//! | `POST` | `/api/control/step` | Run one tick while stopped |

use std::sync::Arc;

use agora_core::genesis::create_world;
use agora_core::{SchedulerStatus, TickSummary};
use axum::Json;
use axum::extract::State;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

/// Response body for every control operation but `step`.
#[derive(Debug, serde::Serialize)]
pub struct ControlResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable message.
    pub message: String,
    /// Scheduler status after the operation.
    pub status: SchedulerStatus,
}

/// Response body for `POST /api/control/step`.
#[derive(Debug, serde::Serialize)]
pub struct StepResponse {
    /// Summary of the tick that ran.
    pub summary: TickSummary,
    /// Scheduler status after the tick.
    pub status: SchedulerStatus,
}

fn respond(state: &AppState, message: &str) -> Json<ControlResponse> {
    info!(operation = message, "Control operation applied");
    Json(ControlResponse {
        ok: true,
        message: message.to_owned(),
        status: state.scheduler.status(),
    })
}

/// `POST /api/control/start`
pub async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ObserverError> {
    state.scheduler.start().await?;
    Ok(respond(&state, "Simulation started"))
}

/// `POST /api/control/pause`
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ObserverError> {
    state.scheduler.pause()?;
    Ok(respond(&state, "Simulation paused"))
}

/// `POST /api/control/resume`
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ObserverError> {
    state.scheduler.resume()?;
    Ok(respond(&state, "Simulation resumed"))
}

/// `POST /api/control/stop`
///
/// Waits for the tick in flight to finish. If the loop had already
/// halted on a failed tick the scheduler is stopped anyway and the
/// failure is reported.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ObserverError> {
    state.scheduler.stop().await?;
    Ok(respond(&state, "Simulation stopped"))
}

/// `POST /api/control/reset`
///
/// Generates tick 0 from the configured seed and installs it. Only
/// allowed while stopped.
pub async fn reset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ObserverError> {
    let ctx = state.scheduler.context();
    let world = create_world(ctx.config(), ctx.rng())?;
    state.scheduler.reset(world).await?;
    Ok(respond(&state, "Simulation reset"))
}

/// `POST /api/control/step`
pub async fn step(State(state): State<Arc<AppState>>) -> Result<Json<StepResponse>, ObserverError> {
    let summary = state.scheduler.step().await?;
    Ok(Json(StepResponse {
        summary,
        status: state.scheduler.status(),
    }))
}
