//! Integration tests for the control surface.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The scheduler behind the router runs against
//! the in-memory stores.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use agora_core::config::SimulationConfig;
use agora_core::genesis::create_world;
use agora_core::store::{InMemoryScentStore, InMemoryWorldStore};
use agora_core::{EventBus, Scheduler, SimulationContext, WorldStore};
use agora_observer::{AppState, build_router};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

const AGENTS: u32 = 6;

fn make_router() -> Router {
    let mut config = SimulationConfig::default();
    config.world.size = 12;
    config.world.initial_agents = AGENTS;
    config.world.tick_interval_ms = 20;
    config.world.agent_sources = vec!["rule_based".to_owned(), "random".to_owned()];

    let ctx = Arc::new(SimulationContext::new(config));
    let world = create_world(ctx.config(), ctx.rng()).unwrap();
    let store: Arc<dyn WorldStore> = Arc::new(InMemoryWorldStore::default());
    let scents = Arc::new(InMemoryScentStore::new(ctx.config().scent_settings()));
    let scheduler = Scheduler::new(ctx, world, Arc::clone(&store), scents, EventBus::new(256));
    build_router(Arc::new(AppState::new(scheduler, store)))
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn status_starts_stopped_at_tick_zero() {
    let router = make_router();
    let (status, body) = send(&router, "GET", "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "stopped");
    assert_eq!(body["tick"], 0);
    assert_eq!(body["agents_alive"], AGENTS);
    assert!(body["last_error"].is_null());
}

#[tokio::test]
async fn step_runs_one_tick_and_logs_events() {
    let router = make_router();

    let (status, body) = send(&router, "POST", "/api/control/step").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["tick"], 1);
    assert_eq!(body["status"]["tick"], 1);
    assert_eq!(body["status"]["state"], "stopped");

    let (status, events) = send(&router, "GET", "/api/events?since=1&limit=500").await;
    assert_eq!(status, StatusCode::OK);
    let events = events.as_array().unwrap();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e["tick"] == 1));
    assert!(events.iter().any(|e| e["event_type"] == "tick_completed"));

    let (_, world) = send(&router, "GET", "/api/world").await;
    assert_eq!(world["tick"], 1);
    assert_eq!(world["world_size"], 12);
}

#[tokio::test]
async fn lifecycle_follows_the_state_machine() {
    let router = make_router();

    let (status, body) = send(&router, "POST", "/api/control/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["state"], "running");

    let (status, body) = send(&router, "POST", "/api/control/start").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, _) = send(&router, "POST", "/api/control/step").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&router, "POST", "/api/control/reset").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&router, "POST", "/api/control/pause").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["state"], "paused");

    let (status, _) = send(&router, "POST", "/api/control/pause").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&router, "POST", "/api/control/resume").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["state"], "running");

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let (status, body) = send(&router, "POST", "/api/control/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["state"], "stopped");
    assert_eq!(body["status"]["stop_reason"], "requested");

    let (status, _) = send(&router, "POST", "/api/control/resume").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reset_returns_to_a_fresh_world() {
    let router = make_router();
    send(&router, "POST", "/api/control/step").await;
    send(&router, "POST", "/api/control/step").await;

    let (status, body) = send(&router, "POST", "/api/control/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["tick"], 0);
    assert_eq!(body["status"]["agents_alive"], AGENTS);
    assert!(body["status"]["last_summary"].is_null());

    let (_, world) = send(&router, "GET", "/api/world").await;
    assert_eq!(world["tick"], 0);
}

#[tokio::test]
async fn agents_are_listed_and_fetched() {
    let router = make_router();

    let (status, agents) = send(&router, "GET", "/api/agents").await;
    assert_eq!(status, StatusCode::OK);
    let agents = agents.as_array().unwrap();
    assert_eq!(agents.len(), 6);

    let (_, dead) = send(&router, "GET", "/api/agents?status=dead").await;
    assert!(dead.as_array().unwrap().is_empty());

    let id = agents[0]["id"].as_str().unwrap().to_owned();
    let (status, agent) = send(&router, "GET", &format!("/api/agents/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agent["id"], id.as_str());
    assert_eq!(agent["name"], agents[0]["name"]);
}

#[tokio::test]
async fn bad_requests_are_rejected() {
    let router = make_router();

    let (status, body) = send(&router, "GET", "/api/agents?status=sleepy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sleepy"));

    let (status, _) = send(&router, "GET", "/api/agents/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        "GET",
        "/api/agents/00000000-0000-0000-0000-000000000000",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "GET", "/api/events?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "GET", "/api/control/start").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn live_feed_requires_an_upgrade() {
    let router = make_router();
    let (status, _) = send(&router, "GET", "/ws/events").await;
    assert!(status.is_client_error());
}
