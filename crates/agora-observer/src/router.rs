//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{control, handlers, ws};

/// Build the complete Axum router.
///
/// CORS allows any origin; the control surface is meant for a local
/// operator and has no authentication.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/events", get(ws::ws_events))
        .route("/api/status", get(handlers::status))
        .route("/api/world", get(handlers::world))
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/agents/{id}", get(handlers::get_agent))
        .route("/api/events", get(handlers::list_events))
        .route("/api/control/start", post(control::start))
        .route("/api/control/pause", post(control::pause))
        .route("/api/control/resume", post(control::resume))
        .route("/api/control/stop", post(control::stop))
        .route("/api/control/reset", post(control::reset))
        .route("/api/control/step", post(control::step))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
