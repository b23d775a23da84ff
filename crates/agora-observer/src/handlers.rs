//! Read-only endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/status` | Scheduler state, tick, population |
//! | `GET` | `/api/world` | Counts of the committed world |
//! | `GET` | `/api/agents` | List agents (`?status=alive\|dead\|all`) |
//! | `GET` | `/api/agents/{id}` | One agent |
//! | `GET` | `/api/events` | Committed events (`?since=&limit=`) |

use std::sync::Arc;

use agora_core::SchedulerStatus;
use agora_types::{Agent, AgentId};
use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

/// Events returned when `limit` is not given.
const DEFAULT_EVENT_LIMIT: usize = 100;

/// Upper bound on `limit`.
const MAX_EVENT_LIMIT: usize = 1000;

/// Query parameters for `GET /api/agents`.
#[derive(Debug, serde::Deserialize)]
pub struct AgentsQuery {
    /// `alive` (default), `dead`, or `all`.
    pub status: Option<String>,
}

/// Query parameters for `GET /api/events`.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// First tick to include (default 0).
    pub since: Option<u64>,
    /// Maximum number of events (default 100, at most 1000).
    pub limit: Option<usize>,
}

/// Response body for `GET /api/world`.
#[derive(Debug, serde::Serialize)]
pub struct WorldSummary {
    /// Tick of the world in memory.
    pub tick: u64,
    /// Side length of the grid.
    pub world_size: i32,
    /// Agents ever created in this run.
    pub agents_total: usize,
    /// Agents alive.
    pub agents_alive: usize,
    /// Resource spawns.
    pub spawns: usize,
    /// Shelters.
    pub shelters: usize,
    /// Claimed cells.
    pub claims: usize,
    /// Employment contracts in any status.
    pub employments: usize,
    /// Signals still visible.
    pub signals: usize,
}

/// Scheduler status.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}

/// Counts of the current world.
pub async fn world(State(state): State<Arc<AppState>>) -> Json<WorldSummary> {
    let world = state.scheduler.world().await;
    Json(WorldSummary {
        tick: world.tick,
        world_size: world.world_size,
        agents_total: world.agents.len(),
        agents_alive: world.living_count(),
        spawns: world.spawns.len(),
        shelters: world.shelters.len(),
        claims: world.claims.len(),
        employments: world.employments.len(),
        signals: world.signals.len(),
    })
}

/// Agents filtered by liveness, in id order.
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentsQuery>,
) -> Result<Json<Vec<Agent>>, ObserverError> {
    let keep: fn(&Agent) -> bool = match query.status.as_deref() {
        None | Some("alive") => Agent::is_alive,
        Some("dead") => |a| !a.is_alive(),
        Some("all") => |_| true,
        Some(other) => {
            return Err(ObserverError::InvalidQuery(format!(
                "status must be alive, dead, or all (got {other})"
            )));
        }
    };
    let world = state.scheduler.world().await;
    Ok(Json(world.agents.into_values().filter(keep).collect()))
}

/// One agent by id, dead or alive.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Agent>, ObserverError> {
    let uuid = Uuid::parse_str(&id).map_err(|e| ObserverError::InvalidUuid(format!("{id}: {e}")))?;
    let agent_id = AgentId::from(uuid);
    let world = state.scheduler.world().await;
    world
        .agent(agent_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound(format!("agent {agent_id}")))
}

/// Committed events from the store, oldest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<agora_types::Event>>, ObserverError> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    if limit == 0 || limit > MAX_EVENT_LIMIT {
        return Err(ObserverError::InvalidQuery(format!(
            "limit must be between 1 and {MAX_EVENT_LIMIT}"
        )));
    }
    let events = state
        .world_store
        .events_since(query.since.unwrap_or(0), limit)
        .await?;
    Ok(Json(events))
}
