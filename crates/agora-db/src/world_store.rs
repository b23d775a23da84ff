//! `PostgreSQL` implementation of the [`WorldStore`] interface.
//!
//! The world is stored as one row per entity in `world_entities`, keyed by
//! `(kind, key)` with a JSONB body:
//!
//! | kind | key | body |
//! |------|-----|------|
//! | `world` | `meta` | tick and grid size |
//! | `agent` | agent id | [`Agent`] |
//! | `spawn`, `shelter` | entity id | spawn or shelter |
//! | `claim` | `x:y` | claim on the cell |
//! | `name` | `x:y:name` | one proposed cell name |
//! | `employment`, `signal`, `credential`, `memory` | entity id | the entity |
//! | `knowledge` | `observer:known` | knowledge record |
//! | `relationship` | `from:to` | trust edge |
//! | `last_result` | agent id | the agent's last action outcome |
//!
//! A commit upserts every row, deletes rows the new world no longer has,
//! and appends the tick's events, all in one transaction.

use std::collections::BTreeMap;

use agora_agents::WorldState;
use agora_core::{StoreError, WorldStore};
use agora_types::{
    Agent, AgentId, Credential, Employment, Event, KnowledgeRecord, LastActionResult,
    LocationClaim, LocationName, Memory, Relationship, ResourceSpawn, Shelter, Signal,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::event_store::{EventStore, insert_events, to_db_tick};
use crate::postgres::PostgresPool;

/// Rows written per upsert statement.
const UPSERT_BATCH_SIZE: usize = 1000;

/// Events written per insert statement during a commit.
const EVENT_BATCH_SIZE: usize = 500;

const KIND_WORLD: &str = "world";
const KIND_AGENT: &str = "agent";
const KIND_SPAWN: &str = "spawn";
const KIND_SHELTER: &str = "shelter";
const KIND_CLAIM: &str = "claim";
const KIND_NAME: &str = "name";
const KIND_EMPLOYMENT: &str = "employment";
const KIND_SIGNAL: &str = "signal";
const KIND_CREDENTIAL: &str = "credential";
const KIND_MEMORY: &str = "memory";
const KIND_KNOWLEDGE: &str = "knowledge";
const KIND_RELATIONSHIP: &str = "relationship";
const KIND_LAST_RESULT: &str = "last_result";

const META_KEY: &str = "meta";

/// Scalar world fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct WorldMeta {
    tick: u64,
    world_size: i32,
}

/// One row of `world_entities`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EntityRow {
    /// Entity kind.
    pub kind: String,
    /// Key within the kind.
    pub key: String,
    /// Serialized entity.
    pub body: serde_json::Value,
}

fn encode<T: Serialize>(kind: &str, key: String, value: &T) -> Result<EntityRow, DbError> {
    Ok(EntityRow {
        kind: kind.to_owned(),
        key,
        body: serde_json::to_value(value)?,
    })
}

fn decode<T: DeserializeOwned>(row: EntityRow) -> Result<T, DbError> {
    serde_json::from_value(row.body).map_err(|e| DbError::CorruptRow {
        kind: row.kind,
        key: row.key,
        reason: e.to_string(),
    })
}

/// Flatten `world` into rows, stamped as the state after `tick`.
pub fn world_rows(world: &WorldState, tick: u64) -> Result<Vec<EntityRow>, DbError> {
    let mut rows = vec![encode(
        KIND_WORLD,
        META_KEY.to_owned(),
        &WorldMeta {
            tick,
            world_size: world.world_size,
        },
    )?];
    for agent in world.agents.values() {
        rows.push(encode(KIND_AGENT, agent.id.to_string(), agent)?);
    }
    for spawn in world.spawns.values() {
        rows.push(encode(KIND_SPAWN, spawn.id.to_string(), spawn)?);
    }
    for shelter in world.shelters.values() {
        rows.push(encode(KIND_SHELTER, shelter.id.to_string(), shelter)?);
    }
    for claim in world.claims.values() {
        let key = format!("{}:{}", claim.position.x, claim.position.y);
        rows.push(encode(KIND_CLAIM, key, claim)?);
    }
    for name in world.names.iter() {
        let key = format!("{}:{}:{}", name.position.x, name.position.y, name.name);
        rows.push(encode(KIND_NAME, key, name)?);
    }
    for employment in world.employments.values() {
        rows.push(encode(KIND_EMPLOYMENT, employment.id.to_string(), employment)?);
    }
    for signal in &world.signals {
        rows.push(encode(KIND_SIGNAL, signal.id.to_string(), signal)?);
    }
    for credential in world.credentials.values() {
        rows.push(encode(KIND_CREDENTIAL, credential.id.to_string(), credential)?);
    }
    for memory in world.memories.iter() {
        rows.push(encode(KIND_MEMORY, memory.id.to_string(), memory)?);
    }
    for record in world.knowledge.iter() {
        let key = format!("{}:{}", record.observer, record.known);
        rows.push(encode(KIND_KNOWLEDGE, key, record)?);
    }
    for edge in world.relationships.iter() {
        let key = format!("{}:{}", edge.from, edge.to);
        rows.push(encode(KIND_RELATIONSHIP, key, edge)?);
    }
    for (agent_id, result) in &world.last_results {
        rows.push(encode(KIND_LAST_RESULT, agent_id.to_string(), result)?);
    }
    Ok(rows)
}

/// Rebuild a world from its rows. `None` when no world was ever committed.
pub fn world_from_rows(rows: Vec<EntityRow>) -> Result<Option<WorldState>, DbError> {
    let mut meta: Option<WorldMeta> = None;
    let mut world = WorldState::default();
    let mut names: Vec<LocationName> = Vec::new();
    let mut memories: Vec<Memory> = Vec::new();
    let mut knowledge: Vec<KnowledgeRecord> = Vec::new();
    let mut relationships: Vec<Relationship> = Vec::new();

    for row in rows {
        match row.kind.as_str() {
            KIND_WORLD => meta = Some(decode(row)?),
            KIND_AGENT => {
                let agent: Agent = decode(row)?;
                world.agents.insert(agent.id, agent);
            }
            KIND_SPAWN => {
                let spawn: ResourceSpawn = decode(row)?;
                world.spawns.insert(spawn.id, spawn);
            }
            KIND_SHELTER => {
                let shelter: Shelter = decode(row)?;
                world.shelters.insert(shelter.id, shelter);
            }
            KIND_CLAIM => {
                let claim: LocationClaim = decode(row)?;
                world.claims.insert(claim.position, claim);
            }
            KIND_NAME => names.push(decode(row)?),
            KIND_EMPLOYMENT => {
                let employment: Employment = decode(row)?;
                world.employments.insert(employment.id, employment);
            }
            KIND_SIGNAL => world.signals.push(decode::<Signal>(row)?),
            KIND_CREDENTIAL => {
                let credential: Credential = decode(row)?;
                world.credentials.insert(credential.id, credential);
            }
            KIND_MEMORY => memories.push(decode(row)?),
            KIND_KNOWLEDGE => knowledge.push(decode(row)?),
            KIND_RELATIONSHIP => relationships.push(decode(row)?),
            KIND_LAST_RESULT => {
                let agent_id = row.key.parse::<Uuid>().map_err(|e| DbError::CorruptRow {
                    kind: row.kind.clone(),
                    key: row.key.clone(),
                    reason: e.to_string(),
                })?;
                let result: LastActionResult = decode(row)?;
                world.last_results.insert(AgentId::from(agent_id), result);
            }
            other => warn!(kind = other, key = %row.key, "Skipping unknown entity row"),
        }
    }

    let Some(meta) = meta else {
        return Ok(None);
    };
    world.tick = meta.tick;
    world.world_size = meta.world_size;
    world.signals.sort_by_key(|s| s.tick);
    names.sort_by_key(|n| n.first_used_tick);
    world.names = names.into_iter().collect();
    world.memories = memories.into_iter().collect();
    world.knowledge = knowledge.into_iter().collect();
    world.relationships = relationships.into_iter().collect();
    Ok(Some(world))
}

/// [`WorldStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresWorldStore {
    pool: PostgresPool,
}

impl PostgresWorldStore {
    /// Store the world through `pool`. Migrations must already have run.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    async fn load_world(&self) -> Result<Option<WorldState>, DbError> {
        let rows = sqlx::query_as::<_, EntityRow>(
            r"SELECT kind, key, body FROM world_entities ORDER BY kind, key",
        )
        .fetch_all(self.pool.pool())
        .await?;
        world_from_rows(rows)
    }

    async fn commit(&self, tick: u64, world: &WorldState, events: &[Event]) -> Result<(), DbError> {
        let rows = world_rows(world, tick)?;
        let db_tick = to_db_tick(tick);
        let mut tx = self.pool.pool().begin().await?;

        for chunk in rows.chunks(UPSERT_BATCH_SIZE) {
            let kinds: Vec<&str> = chunk.iter().map(|r| r.kind.as_str()).collect();
            let keys: Vec<&str> = chunk.iter().map(|r| r.key.as_str()).collect();
            let bodies: Vec<serde_json::Value> = chunk.iter().map(|r| r.body.clone()).collect();
            sqlx::query(
                r"INSERT INTO world_entities (kind, key, body, updated_tick)
                  SELECT t.kind, t.key, t.body, $4
                  FROM UNNEST($1::TEXT[], $2::TEXT[], $3::JSONB[]) AS t(kind, key, body)
                  ON CONFLICT (kind, key)
                  DO UPDATE SET body = EXCLUDED.body, updated_tick = EXCLUDED.updated_tick",
            )
            .bind(&kinds)
            .bind(&keys)
            .bind(&bodies)
            .bind(db_tick)
            .execute(&mut *tx)
            .await?;
        }

        let kinds: Vec<&str> = rows.iter().map(|r| r.kind.as_str()).collect();
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        let removed = sqlx::query(
            r"DELETE FROM world_entities w
              WHERE NOT EXISTS (
                  SELECT 1 FROM UNNEST($1::TEXT[], $2::TEXT[]) AS t(kind, key)
                  WHERE t.kind = w.kind AND t.key = w.key
              )",
        )
        .bind(&kinds)
        .bind(&keys)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        insert_events(&mut tx, events, EVENT_BATCH_SIZE).await?;
        tx.commit().await?;

        debug!(
            tick,
            rows = rows.len(),
            removed,
            events = events.len(),
            "Committed tick to PostgreSQL"
        );
        Ok(())
    }

    async fn put_agent(&self, agent: &Agent) -> Result<(), DbError> {
        let row = encode(KIND_AGENT, agent.id.to_string(), agent)?;
        sqlx::query(
            r"INSERT INTO world_entities (kind, key, body, updated_tick)
              VALUES ($1, $2, $3, COALESCE(
                  (SELECT (body->>'tick')::BIGINT FROM world_entities
                   WHERE kind = 'world' AND key = 'meta'), 0))
              ON CONFLICT (kind, key) DO UPDATE SET body = EXCLUDED.body",
        )
        .bind(&row.kind)
        .bind(&row.key)
        .bind(&row.body)
        .execute(self.pool.pool())
        .await?;
        Ok(())
    }

    async fn fetch_agent(&self, id: AgentId) -> Result<Option<Agent>, DbError> {
        let row = sqlx::query_as::<_, EntityRow>(
            r"SELECT kind, key, body FROM world_entities WHERE kind = $1 AND key = $2",
        )
        .bind(KIND_AGENT)
        .bind(id.to_string())
        .fetch_optional(self.pool.pool())
        .await?;
        row.map(decode).transpose()
    }

    async fn remove_agent(&self, id: AgentId) -> Result<bool, DbError> {
        let removed = sqlx::query(r"DELETE FROM world_entities WHERE kind = $1 AND key = $2")
            .bind(KIND_AGENT)
            .bind(id.to_string())
            .execute(self.pool.pool())
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    async fn read_events(&self, tick: u64, limit: usize) -> Result<Vec<Event>, DbError> {
        EventStore::new(self.pool.pool())
            .events_since(tick, limit)
            .await?
            .into_iter()
            .map(crate::event_store::EventRow::into_event)
            .collect()
    }
}

impl WorldStore for PostgresWorldStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<WorldState>, StoreError>> {
        async move { self.load_world().await.map_err(StoreError::from) }.boxed()
    }

    fn commit_tick<'a>(
        &'a self,
        tick: u64,
        world: &'a WorldState,
        events: &'a [Event],
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            self.commit(tick, world, events)
                .await
                .map_err(StoreError::from)
        }
        .boxed()
    }

    fn upsert_agent<'a>(&'a self, agent: &'a Agent) -> BoxFuture<'a, Result<(), StoreError>> {
        async move { self.put_agent(agent).await.map_err(StoreError::from) }.boxed()
    }

    fn get_agent(&self, id: AgentId) -> BoxFuture<'_, Result<Option<Agent>, StoreError>> {
        async move { self.fetch_agent(id).await.map_err(StoreError::from) }.boxed()
    }

    fn delete_agent(&self, id: AgentId) -> BoxFuture<'_, Result<bool, StoreError>> {
        async move { self.remove_agent(id).await.map_err(StoreError::from) }.boxed()
    }

    fn events_since(
        &self,
        tick: u64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Event>, StoreError>> {
        async move {
            self.read_events(tick, limit)
                .await
                .map_err(StoreError::from)
        }
        .boxed()
    }
}

/// Rows grouped by kind, for logs and tests.
pub fn count_by_kind(rows: &[EntityRow]) -> BTreeMap<&str, usize> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        let count = counts.entry(row.kind.as_str()).or_insert(0);
        *count = count.saturating_add(1);
    }
    counts
}
