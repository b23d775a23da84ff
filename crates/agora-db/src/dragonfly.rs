//! `Dragonfly` (Redis-compatible) scent traces.
//!
//! Scent is the only hot state the simulation keeps outside the world
//! store. Each cell holds at most one trace under `scent:{x}:{y}`; a newer
//! trace overwrites the older one and `Dragonfly` expires it on its own.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `scent:{x}:{y}` | JSON, `EX` ttl | Latest [`ScentTrace`] on the cell |

use agora_core::{ScentStore, StoreError};
use agora_types::{Position, ScentTrace};
use agora_world::ScentSettings;
use agora_world::scent::ttl_whole_seconds;
use fred::prelude::*;
use fred::types::Expiration;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::DbError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    pub async fn flush_all(&self) -> Result<(), DbError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

/// Key holding the trace on `position`.
pub fn scent_key(position: Position) -> String {
    format!("scent:{}:{}", position.x, position.y)
}

/// [`ScentStore`] backed by `Dragonfly` key expiry.
#[derive(Clone)]
pub struct DragonflyScentStore {
    pool: DragonflyPool,
    settings: ScentSettings,
}

impl DragonflyScentStore {
    /// Store traces in `pool` for as long as `settings` allows.
    pub const fn new(pool: DragonflyPool, settings: ScentSettings) -> Self {
        Self { pool, settings }
    }

    async fn write(&self, trace: ScentTrace) -> Result<(), DbError> {
        let Some(ttl) = self.settings.ttl() else {
            return Ok(());
        };
        let seconds = i64::try_from(ttl_whole_seconds(ttl)).unwrap_or(i64::MAX);
        let json = serde_json::to_string(&trace)?;
        let _: () = self
            .pool
            .client()
            .set(
                scent_key(trace.position),
                json.as_str(),
                Some(Expiration::EX(seconds)),
                None,
                false,
            )
            .await?;
        Ok(())
    }

    async fn read(&self, positions: &[Position]) -> Result<Vec<ScentTrace>, DbError> {
        if positions.is_empty() || self.settings.ttl().is_none() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = positions.iter().copied().map(scent_key).collect();
        let values: Vec<Option<String>> = self.pool.client().mget(keys).await?;
        let mut traces = Vec::new();
        for value in values.into_iter().flatten() {
            traces.push(serde_json::from_str(&value)?);
        }
        Ok(traces)
    }
}

impl ScentStore for DragonflyScentStore {
    fn leave_scent(&self, trace: ScentTrace) -> BoxFuture<'_, Result<(), StoreError>> {
        async move { self.write(trace).await.map_err(StoreError::from) }.boxed()
    }

    fn scents_at<'a>(
        &'a self,
        positions: &'a [Position],
    ) -> BoxFuture<'a, Result<Vec<ScentTrace>, StoreError>> {
        async move { self.read(positions).await.map_err(StoreError::from) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_name_the_cell() {
        assert_eq!(scent_key(Position::new(3, 17)), "scent:3:17");
        assert_eq!(scent_key(Position::new(0, 0)), "scent:0:0");
    }
}
