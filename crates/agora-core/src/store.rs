//! Persistence interfaces and their in-memory implementations.
//!
//! The scheduler only ever talks to [`WorldStore`] and [`ScentStore`]. A
//! tick's working copy becomes authoritative only after
//! [`WorldStore::commit_tick`] succeeds, so a failing store can abort a tick
//! but never half-apply one.
//!
//! The in-memory stores here back tests and single-process runs. The
//! Dragonfly and `PostgreSQL` implementations live in `agora-db`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use agora_agents::WorldState;
use agora_types::{Agent, AgentId, Event, Position, ScentTrace};
use agora_world::ScentSettings;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::Instant;

/// Errors raised by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Authoritative storage of the world and its event log.
pub trait WorldStore: Send + Sync {
    /// The last committed world, or `None` for a fresh store.
    fn load(&self) -> BoxFuture<'_, Result<Option<WorldState>, StoreError>>;

    /// Persist `world` as the state after `tick`, together with the events
    /// the tick produced. All or nothing.
    fn commit_tick<'a>(
        &'a self,
        tick: u64,
        world: &'a WorldState,
        events: &'a [Event],
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Insert or replace one agent outside the tick cycle.
    fn upsert_agent<'a>(&'a self, agent: &'a Agent) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Fetch one agent.
    fn get_agent(&self, id: AgentId) -> BoxFuture<'_, Result<Option<Agent>, StoreError>>;

    /// Remove one agent. Returns whether it existed.
    fn delete_agent(&self, id: AgentId) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Up to `limit` committed events from `tick` onward, oldest first.
    fn events_since(&self, tick: u64, limit: usize)
    -> BoxFuture<'_, Result<Vec<Event>, StoreError>>;
}

/// Time-limited scent traces, one per cell.
pub trait ScentStore: Send + Sync {
    /// Leave a trace, replacing any older trace on the same cell.
    fn leave_scent(&self, trace: ScentTrace) -> BoxFuture<'_, Result<(), StoreError>>;

    /// The unexpired traces on any of `positions`.
    fn scents_at<'a>(
        &'a self,
        positions: &'a [Position],
    ) -> BoxFuture<'a, Result<Vec<ScentTrace>, StoreError>>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// In-memory world store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryWorld {
    world: Option<WorldState>,
    events: VecDeque<Event>,
}

/// A [`WorldStore`] held in process memory.
///
/// Keeps at most `event_capacity` events. Can be switched into an
/// unavailable state to exercise infrastructure-failure paths.
#[derive(Debug)]
pub struct InMemoryWorldStore {
    inner: Mutex<MemoryWorld>,
    event_capacity: usize,
    unavailable: AtomicBool,
}

impl Default for InMemoryWorldStore {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl InMemoryWorldStore {
    /// An empty store retaining up to `event_capacity` events.
    pub fn new(event_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryWorld::default()),
            event_capacity,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail (or succeed again) with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_owned()));
        }
        Ok(())
    }

    /// Tick of the last committed world, if any.
    pub fn committed_tick(&self) -> Option<u64> {
        lock(&self.inner).world.as_ref().map(|w| w.tick)
    }

    /// Number of retained events.
    pub fn event_count(&self) -> usize {
        lock(&self.inner).events.len()
    }
}

impl WorldStore for InMemoryWorldStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<WorldState>, StoreError>> {
        let result = self.check().map(|()| lock(&self.inner).world.clone());
        futures::future::ready(result).boxed()
    }

    fn commit_tick<'a>(
        &'a self,
        tick: u64,
        world: &'a WorldState,
        events: &'a [Event],
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self.check().map(|()| {
            let mut inner = lock(&self.inner);
            let mut committed = world.clone();
            committed.tick = tick;
            inner.world = Some(committed);
            for event in events {
                if inner.events.len() >= self.event_capacity {
                    inner.events.pop_front();
                }
                inner.events.push_back(event.clone());
            }
        });
        futures::future::ready(result).boxed()
    }

    fn upsert_agent<'a>(&'a self, agent: &'a Agent) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self.check().map(|()| {
            let mut inner = lock(&self.inner);
            inner
                .world
                .get_or_insert_with(WorldState::default)
                .insert_agent(agent.clone());
        });
        futures::future::ready(result).boxed()
    }

    fn get_agent(&self, id: AgentId) -> BoxFuture<'_, Result<Option<Agent>, StoreError>> {
        let result = self.check().map(|()| {
            lock(&self.inner)
                .world
                .as_ref()
                .and_then(|w| w.agent(id).cloned())
        });
        futures::future::ready(result).boxed()
    }

    fn delete_agent(&self, id: AgentId) -> BoxFuture<'_, Result<bool, StoreError>> {
        let result = self.check().map(|()| {
            lock(&self.inner)
                .world
                .as_mut()
                .is_some_and(|w| w.agents.remove(&id).is_some())
        });
        futures::future::ready(result).boxed()
    }

    fn events_since(
        &self,
        tick: u64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Event>, StoreError>> {
        let result = self.check().map(|()| {
            lock(&self.inner)
                .events
                .iter()
                .filter(|e| e.tick >= tick)
                .take(limit)
                .cloned()
                .collect()
        });
        futures::future::ready(result).boxed()
    }
}

// ---------------------------------------------------------------------------
// In-memory scent store
// ---------------------------------------------------------------------------

/// A [`ScentStore`] that expires traces against tokio's clock, so paused
/// test time controls expiry.
///
/// Expiry follows elapsed time, not ticks. Two runs with the same seed that
/// step at different real speeds can therefore show different scents in
/// observations; only decision sources that read scents are affected.
#[derive(Debug)]
pub struct InMemoryScentStore {
    settings: ScentSettings,
    traces: Mutex<BTreeMap<Position, (ScentTrace, Instant)>>,
}

impl InMemoryScentStore {
    /// An empty store using `settings` for TTL.
    pub fn new(settings: ScentSettings) -> Self {
        Self {
            settings,
            traces: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of traces held, expired ones included until next read.
    pub fn len(&self) -> usize {
        lock(&self.traces).len()
    }

    /// Whether no traces are held.
    pub fn is_empty(&self) -> bool {
        lock(&self.traces).is_empty()
    }
}

impl ScentStore for InMemoryScentStore {
    fn leave_scent(&self, trace: ScentTrace) -> BoxFuture<'_, Result<(), StoreError>> {
        if let Some(ttl) = self.settings.ttl() {
            let expires = Instant::now()
                .checked_add(ttl)
                .unwrap_or_else(Instant::now);
            lock(&self.traces).insert(trace.position, (trace, expires));
        }
        futures::future::ready(Ok(())).boxed()
    }

    fn scents_at<'a>(
        &'a self,
        positions: &'a [Position],
    ) -> BoxFuture<'a, Result<Vec<ScentTrace>, StoreError>> {
        let now = Instant::now();
        let mut traces = lock(&self.traces);
        traces.retain(|_, (_, expires)| *expires > now);
        let found = positions
            .iter()
            .filter_map(|p| traces.get(p).map(|(trace, _)| *trace))
            .collect();
        futures::future::ready(Ok(found)).boxed()
    }
}
