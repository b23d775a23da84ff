//! The append-only event log in `PostgreSQL`.
//!
//! Every tick's events are written in the same transaction as the world
//! rows (see [`world_store`](crate::world_store)), so the log never runs
//! ahead of or behind the committed world.

use agora_types::{AgentId, Event, EventId, EventType};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DbError;

/// Default batch size for event inserts.
const DEFAULT_BATCH_SIZE: usize = 500;

/// Operations on the `events` table.
pub struct EventStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Insert `events` in one transaction of their own.
    pub async fn batch_insert(&self, events: &[Event]) -> Result<(), DbError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        insert_events(&mut tx, events, self.batch_size).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Events of one tick, in commit order.
    pub async fn get_events_by_tick(&self, tick: u64) -> Result<Vec<EventRow>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT seq, id, tick, event_type, agent_id, payload, created_at
              FROM events
              WHERE tick = $1
              ORDER BY seq",
        )
        .bind(to_db_tick(tick))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Events caused by `agent_id` in `[from_tick, to_tick)`.
    pub async fn get_events_by_agent(
        &self,
        agent_id: AgentId,
        from_tick: u64,
        to_tick: u64,
    ) -> Result<Vec<EventRow>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT seq, id, tick, event_type, agent_id, payload, created_at
              FROM events
              WHERE agent_id = $1 AND tick >= $2 AND tick < $3
              ORDER BY seq",
        )
        .bind(agent_id.into_inner())
        .bind(to_db_tick(from_tick))
        .bind(to_db_tick(to_tick))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Up to `limit` events from `tick` onward, oldest first.
    pub async fn events_since(&self, tick: u64, limit: usize) -> Result<Vec<EventRow>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT seq, id, tick, event_type, agent_id, payload, created_at
              FROM events
              WHERE tick >= $1
              ORDER BY seq
              LIMIT $2",
        )
        .bind(to_db_tick(tick))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// Insert `events` on an open connection, `batch_size` rows per statement.
///
/// Each statement unnests parallel arrays, so a tick's events cost one
/// round-trip per batch rather than one per event.
pub async fn insert_events(
    conn: &mut PgConnection,
    events: &[Event],
    batch_size: usize,
) -> Result<(), DbError> {
    for chunk in events.chunks(batch_size.max(1)) {
        let len = chunk.len();
        let mut ids = Vec::with_capacity(len);
        let mut ticks = Vec::with_capacity(len);
        let mut event_types = Vec::with_capacity(len);
        let mut agent_ids: Vec<Option<Uuid>> = Vec::with_capacity(len);
        let mut payloads = Vec::with_capacity(len);
        let mut timestamps = Vec::with_capacity(len);

        for event in chunk {
            ids.push(event.id.into_inner());
            ticks.push(to_db_tick(event.tick));
            event_types.push(event.event_type.as_str().to_owned());
            agent_ids.push(event.agent_id.map(AgentId::into_inner));
            payloads.push(event.payload.clone());
            timestamps.push(event.timestamp);
        }

        sqlx::query(
            r"INSERT INTO events (id, tick, event_type, agent_id, payload, created_at)
              SELECT * FROM UNNEST($1::UUID[], $2::BIGINT[], $3::TEXT[], $4::UUID[], $5::JSONB[], $6::TIMESTAMPTZ[])",
        )
        .bind(&ids)
        .bind(&ticks)
        .bind(&event_types)
        .bind(&agent_ids)
        .bind(&payloads)
        .bind(&timestamps)
        .execute(&mut *conn)
        .await?;
    }

    tracing::debug!(count = events.len(), "Inserted events (batch UNNEST)");
    Ok(())
}

/// Ticks are `u64` in memory and `BIGINT` on disk.
pub fn to_db_tick(tick: u64) -> i64 {
    i64::try_from(tick).unwrap_or(i64::MAX)
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Insertion order.
    pub seq: i64,
    /// Event id.
    pub id: Uuid,
    /// Tick the event belongs to.
    pub tick: i64,
    /// `snake_case` event type.
    pub event_type: String,
    /// Agent that caused the event, if any.
    pub agent_id: Option<Uuid>,
    /// Event payload.
    pub payload: serde_json::Value,
    /// Wall-clock emission time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl EventRow {
    /// Turn the row back into an [`Event`].
    pub fn into_event(self) -> Result<Event, DbError> {
        let event_type: EventType =
            serde_json::from_value(serde_json::Value::String(self.event_type.clone())).map_err(
                |e| DbError::CorruptRow {
                    kind: "event".to_owned(),
                    key: self.id.to_string(),
                    reason: format!("unknown event type {}: {e}", self.event_type),
                },
            )?;
        Ok(Event {
            id: EventId::from(self.id),
            event_type,
            tick: u64::try_from(self.tick).unwrap_or(0),
            timestamp: self.created_at,
            agent_id: self.agent_id.map(AgentId::from),
            payload: self.payload,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(event_type: &str) -> EventRow {
        EventRow {
            seq: 1,
            id: Uuid::nil(),
            tick: 7,
            event_type: event_type.to_owned(),
            agent_id: Some(Uuid::nil()),
            payload: json!({ "n": 1 }),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn rows_decode_into_events() {
        let event = row("agent_moved").into_event().unwrap();
        assert_eq!(event.event_type, EventType::AgentMoved);
        assert_eq!(event.tick, 7);
        assert_eq!(event.agent_id, Some(AgentId::from(Uuid::nil())));
        assert_eq!(event.payload["n"], 1);
    }

    #[test]
    fn unknown_types_are_corrupt() {
        let err = row("volcano").into_event().unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { .. }));
    }

    #[test]
    fn ticks_saturate_on_disk() {
        assert_eq!(to_db_tick(5), 5);
        assert_eq!(to_db_tick(u64::MAX), i64::MAX);
    }
}
