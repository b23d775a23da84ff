//! Backing-store selection and the starting world.

use std::sync::Arc;

use agora_agents::WorldState;
use agora_core::config::{SimulationConfig, StoreBackend};
use agora_core::genesis::create_world;
use agora_core::store::{InMemoryScentStore, InMemoryWorldStore};
use agora_core::{ScentStore, SimulationContext, WorldStore};
use agora_db::{DragonflyPool, DragonflyScentStore, PostgresPool, PostgresWorldStore};
use tracing::info;

use crate::error::EngineError;

/// The stores a run persists to.
pub struct Stores {
    /// World state and event log.
    pub world: Arc<dyn WorldStore>,
    /// Scent traces.
    pub scent: Arc<dyn ScentStore>,
}

/// Connect the configured backend.
///
/// `postgres` also runs pending migrations and connects Dragonfly for
/// scent.
pub async fn connect_stores(config: &SimulationConfig) -> Result<Stores, EngineError> {
    let infra = &config.infrastructure;
    let settings = config.scent_settings();
    match infra.store {
        StoreBackend::Memory => {
            info!("Using in-memory stores");
            Ok(Stores {
                world: Arc::new(InMemoryWorldStore::new(config.events.history_capacity)),
                scent: Arc::new(InMemoryScentStore::new(settings)),
            })
        }
        StoreBackend::Postgres => {
            let pg = PostgresPool::connect_url(&infra.postgres_url).await?;
            pg.run_migrations().await?;
            let dragonfly = DragonflyPool::connect(&infra.dragonfly_url).await?;
            info!("Using PostgreSQL world store and Dragonfly scent store");
            Ok(Stores {
                world: Arc::new(PostgresWorldStore::new(pg)),
                scent: Arc::new(DragonflyScentStore::new(dragonfly, settings)),
            })
        }
    }
}

/// The last committed world, or a fresh genesis committed as tick 0.
pub async fn initial_world(
    ctx: &SimulationContext,
    store: &dyn WorldStore,
) -> Result<WorldState, EngineError> {
    if let Some(world) = store.load().await? {
        info!(
            tick = world.tick,
            agents_alive = world.living_count(),
            "Resuming committed world"
        );
        return Ok(world);
    }

    let world = create_world(ctx.config(), ctx.rng())?;
    store.commit_tick(0, &world, &[]).await?;
    info!(
        agents = world.agents.len(),
        spawns = world.spawns.len(),
        shelters = world.shelters.len(),
        "Fresh world created"
    );
    Ok(world)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.size = 10;
        config.world.initial_agents = 4;
        config
    }

    #[tokio::test]
    async fn memory_backend_starts_from_genesis_then_resumes() {
        let config = small_config();
        let stores = connect_stores(&config).await.unwrap();
        let ctx = SimulationContext::new(config);

        let fresh = initial_world(&ctx, stores.world.as_ref()).await.unwrap();
        assert_eq!(fresh.tick, 0);
        assert_eq!(fresh.agents.len(), 4);

        let mut later = fresh.clone();
        later.tick = 9;
        stores.world.commit_tick(9, &later, &[]).await.unwrap();

        let resumed = initial_world(&ctx, stores.world.as_ref()).await.unwrap();
        assert_eq!(resumed.tick, 9);
        assert_eq!(resumed.agents, fresh.agents);
    }
}
