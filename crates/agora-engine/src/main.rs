//! Simulation binary for Agora.
//!
//! Wires the configured stores, decision sources, scheduler, and control
//! surface together, starts the tick loop, and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `AGORA_CONFIG` (default `agora-config.yaml`)
//! 3. Build the simulation context with per-source API keys
//! 4. Register a NATS decision source for every configured agent source
//!    that is not a built-in strategy
//! 5. Connect the store backend and load or create the world
//! 6. Start the control surface and the tick loop
//! 7. On `Ctrl-C`, stop the loop and drain the server

mod error;
mod nats_decision;
mod stores;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use agora_core::config::SimulationConfig;
use agora_core::{ApiKeyStore, EventBus, Scheduler, SchedulerError, SimulationContext};
use agora_observer::{AppState, ServerConfig, spawn_observer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::nats_decision::NatsDecisionSource;
use crate::stores::{connect_stores, initial_world};

/// Config file used when `AGORA_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "agora-config.yaml";

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    init_tracing();
    info!("agora-engine starting");

    let config_path = std::env::var("AGORA_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = SimulationConfig::load(&config_path)?;
    info!(
        path = %config_path.display(),
        seed = config.world.seed,
        size = config.world.size,
        tick_interval_ms = config.world.tick_interval_ms,
        decision_timeout_ms = config.dispatch.decision_timeout_ms,
        store = ?config.infrastructure.store,
        "Configuration loaded"
    );

    let api_keys = Arc::new(ApiKeyStore::from_env(
        config.world.agent_sources.iter().map(String::as_str),
    ));
    let ctx = Arc::new(SimulationContext::new(config).with_api_keys(api_keys));
    let remote = register_remote_sources(&ctx).await?;
    info!(remote_sources = remote, sources = ?ctx.source_names(), "Decision sources ready");

    let stores = connect_stores(ctx.config()).await?;
    let world = initial_world(&ctx, stores.world.as_ref()).await?;

    let bus = EventBus::new(ctx.config().events.bus_capacity);
    let scheduler = Scheduler::new(
        Arc::clone(&ctx),
        world,
        Arc::clone(&stores.world),
        stores.scent,
        bus,
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let app_state = Arc::new(AppState::new(Arc::clone(&scheduler), stores.world));
    let server_config = ServerConfig::on_port(ctx.config().infrastructure.observer_port);
    let server = spawn_observer(&server_config, app_state, async move {
        let _ = shutdown_rx.await;
    })
    .await?;

    scheduler.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
    info!("Shutdown requested");

    match scheduler.stop().await {
        Ok(()) | Err(SchedulerError::InvalidTransition { .. }) => {}
        Err(e) => warn!(error = %e, "Simulation had already stopped"),
    }
    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Control surface exited with error"),
        Err(e) => warn!(error = %e, "Control surface task failed"),
    }

    let status = scheduler.status();
    info!(
        tick = status.tick,
        agents_alive = status.agents_alive,
        "agora-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` filters (default `info`);
/// `AGORA_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("AGORA_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Agent sources in the config that no built-in strategy answers.
fn remote_source_names(ctx: &SimulationContext) -> BTreeSet<String> {
    ctx.config()
        .world
        .agent_sources
        .iter()
        .filter(|name| ctx.source(name).is_none())
        .cloned()
        .collect()
}

/// Register a [`NatsDecisionSource`] for each remote source name.
///
/// Without a NATS URL the names stay unregistered and dispatch hands
/// their agents to the fallback strategy.
async fn register_remote_sources(ctx: &SimulationContext) -> Result<usize, EngineError> {
    let names = remote_source_names(ctx);
    if names.is_empty() {
        return Ok(0);
    }
    let infra = &ctx.config().infrastructure;
    let Some(url) = infra.nats_url.as_deref() else {
        warn!(
            sources = ?names,
            "No NATS URL configured, these agents will use the fallback strategy"
        );
        return Ok(0);
    };

    info!(nats_url = url, "Connecting to NATS");
    let client = async_nats::connect(url)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("failed to connect to NATS at {url}: {e}"),
        })?;

    for name in &names {
        ctx.register_source(Arc::new(NatsDecisionSource::new(
            name,
            client.clone(),
            &infra.decision_subject,
            Arc::clone(ctx.api_keys()),
        )));
    }
    Ok(names.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn built_in_strategies_are_not_remote() {
        let mut config = SimulationConfig::default();
        config.world.agent_sources = vec![
            "rule_based".to_owned(),
            "llm".to_owned(),
            "sugarscape".to_owned(),
            "llm".to_owned(),
        ];
        let ctx = SimulationContext::new(config);
        let remote = remote_source_names(&ctx);
        assert_eq!(remote.into_iter().collect::<Vec<_>>(), vec!["llm"]);
    }

    #[tokio::test]
    async fn remote_sources_without_nats_fall_back() {
        let mut config = SimulationConfig::default();
        config.world.agent_sources = vec!["llm".to_owned()];
        config.infrastructure.nats_url = None;
        let ctx = SimulationContext::new(config);
        assert_eq!(register_remote_sources(&ctx).await.unwrap(), 0);
        assert!(ctx.source("llm").is_none());
    }
}
