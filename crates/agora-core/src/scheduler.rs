//! The tick scheduler state machine.
//!
//! ```text
//! stopped --start--> running --pause--> paused
//!    ^                  |  ^---resume----'  |
//!    '------stop--------'-------stop--------'
//! ```
//!
//! A [`Scheduler`] owns the authoritative [`WorldState`] and a background
//! loop that runs one tick per interval while `running`. The world is only
//! replaced after a tick's commit succeeds. A store failure stops the loop,
//! records `last_error`, and waits for an explicit `start()`.
//!
//! The loop also stops by itself on extinction or when `max_ticks` is
//! reached.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use agora_agents::WorldState;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::events::{EventBus, RecentEvents};
use crate::registry::SimulationContext;
use crate::store::{ScentStore, StoreError, WorldStore};
use crate::tick::{TickError, TickSummary, run_tick};

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No loop is running. Reset and step are allowed.
    Stopped,
    /// Ticks run on the interval.
    Running,
    /// The loop is parked until resumed or stopped.
    Paused,
}

impl SchedulerState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Running => 1,
            Self::Paused => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        })
    }
}

/// Why the loop last stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `stop()` was called.
    Requested,
    /// The configured tick limit was reached.
    MaxTicks,
    /// No agent is alive.
    Extinction,
    /// A tick could not be committed.
    Failed,
}

/// Errors returned by scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while {from}")]
    InvalidTransition {
        /// State the scheduler was in.
        from: SchedulerState,
        /// Operation that was refused.
        operation: &'static str,
    },

    /// The loop stopped because a tick failed.
    #[error("simulation stopped after a failed tick: {0}")]
    Halted(String),

    /// A stepped tick failed.
    #[error(transparent)]
    Tick(#[from] TickError),

    /// The reset world could not be stored.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Point-in-time view of the scheduler for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    /// Lifecycle state.
    pub state: SchedulerState,
    /// Last committed tick.
    pub tick: u64,
    /// Living agents after the last committed tick.
    pub agents_alive: usize,
    /// Why the loop last stopped, if it has.
    pub stop_reason: Option<StopReason>,
    /// Error that stopped the loop, until the next start or reset.
    pub last_error: Option<String>,
    /// Summary of the last committed tick.
    pub last_summary: Option<TickSummary>,
}

/// State guarded for the duration of a tick.
struct TickState {
    world: WorldState,
    recent: RecentEvents,
}

/// Owns the world and drives ticks.
pub struct Scheduler {
    ctx: Arc<SimulationContext>,
    world_store: Arc<dyn WorldStore>,
    scent_store: Arc<dyn ScentStore>,
    bus: EventBus,
    state: AtomicU8,
    wake: Notify,
    tick_state: Mutex<TickState>,
    task: Mutex<Option<JoinHandle<()>>>,
    committed_tick: AtomicU64,
    agents_alive: AtomicUsize,
    report: std::sync::Mutex<Report>,
}

#[derive(Debug, Default)]
struct Report {
    stop_reason: Option<StopReason>,
    last_error: Option<String>,
    last_summary: Option<TickSummary>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("tick", &self.committed_tick.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// A stopped scheduler over `world`.
    pub fn new(
        ctx: Arc<SimulationContext>,
        world: WorldState,
        world_store: Arc<dyn WorldStore>,
        scent_store: Arc<dyn ScentStore>,
        bus: EventBus,
    ) -> Arc<Self> {
        let history = ctx.config().events.history_capacity;
        Arc::new(Self {
            committed_tick: AtomicU64::new(world.tick),
            agents_alive: AtomicUsize::new(world.living_count()),
            ctx,
            world_store,
            scent_store,
            bus,
            state: AtomicU8::new(SchedulerState::Stopped.as_u8()),
            wake: Notify::new(),
            tick_state: Mutex::new(TickState {
                world,
                recent: RecentEvents::new(history),
            }),
            task: Mutex::new(None),
            report: std::sync::Mutex::new(Report::default()),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(
        &self,
        from: &[SchedulerState],
        to: SchedulerState,
        operation: &'static str,
    ) -> Result<SchedulerState, SchedulerError> {
        for candidate in from {
            if self
                .state
                .compare_exchange(
                    candidate.as_u8(),
                    to.as_u8(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Ok(*candidate);
            }
        }
        Err(SchedulerError::InvalidTransition {
            from: self.state(),
            operation,
        })
    }

    fn with_report<T>(&self, f: impl FnOnce(&mut Report) -> T) -> T {
        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut report)
    }

    /// Start the tick loop. Only allowed while stopped.
    pub async fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let mut task = self.task.lock().await;
        if self.state() != SchedulerState::Stopped {
            return Err(SchedulerError::InvalidTransition {
                from: self.state(),
                operation: "start",
            });
        }
        if let Some(previous) = task.take()
            && let Err(e) = previous.await
        {
            warn!(error = %e, "Previous tick loop ended abnormally");
        }
        self.transition(&[SchedulerState::Stopped], SchedulerState::Running, "start")?;
        self.with_report(|r| {
            r.stop_reason = None;
            r.last_error = None;
        });
        info!(
            tick = self.committed_tick.load(Ordering::Acquire),
            "Simulation started"
        );
        *task = Some(tokio::spawn(Arc::clone(self).run_loop()));
        Ok(())
    }

    /// Park the loop after the current tick.
    pub fn pause(&self) -> Result<(), SchedulerError> {
        self.transition(&[SchedulerState::Running], SchedulerState::Paused, "pause")?;
        info!("Simulation paused");
        Ok(())
    }

    /// Wake a paused loop.
    pub fn resume(&self) -> Result<(), SchedulerError> {
        self.transition(&[SchedulerState::Paused], SchedulerState::Running, "resume")?;
        self.wake.notify_one();
        info!("Simulation resumed");
        Ok(())
    }

    /// Stop the loop and wait for it to finish. A tick in flight either
    /// commits or is abandoned before this returns.
    ///
    /// When the loop already stopped itself because of a failed tick, the
    /// failure is returned here.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let stopped = self.transition(
            &[SchedulerState::Running, SchedulerState::Paused],
            SchedulerState::Stopped,
            "stop",
        );
        if let Err(refused) = stopped {
            if let Some(message) = self.with_report(|r| r.last_error.clone()) {
                return Err(SchedulerError::Halted(message));
            }
            return Err(refused);
        }
        self.with_report(|r| r.stop_reason = Some(StopReason::Requested));
        self.wake.notify_one();

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Tick loop ended abnormally");
        }
        info!(
            tick = self.committed_tick.load(Ordering::Acquire),
            "Simulation stopped"
        );
        Ok(())
    }

    /// Replace the world and rewind to tick 0. Only allowed while stopped.
    ///
    /// Learned strategy state, counters, event history and any recorded
    /// error are cleared too.
    pub async fn reset(&self, mut world: WorldState) -> Result<(), SchedulerError> {
        self.require_stopped("reset")?;
        let mut tick_state = self.tick_state.lock().await;
        self.require_stopped("reset")?;

        world.tick = 0;
        self.world_store.commit_tick(0, &world, &[]).await?;
        self.ctx.reset_strategies();
        self.committed_tick.store(0, Ordering::Release);
        self.agents_alive
            .store(world.living_count(), Ordering::Release);
        tick_state.world = world;
        tick_state.recent.clear();
        self.with_report(|r| *r = Report::default());
        info!(agents = tick_state.world.agents.len(), "Simulation reset");
        Ok(())
    }

    /// Run exactly one tick. Only allowed while stopped.
    pub async fn step(&self) -> Result<TickSummary, SchedulerError> {
        self.require_stopped("step")?;
        let mut tick_state = self.tick_state.lock().await;
        self.require_stopped("step")?;
        match self.advance(&mut tick_state).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(error = %e, "Stepped tick failed");
                self.with_report(|r| r.last_error = Some(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Snapshot of the scheduler.
    pub fn status(&self) -> SchedulerStatus {
        let (stop_reason, last_error, last_summary) =
            self.with_report(|r| (r.stop_reason, r.last_error.clone(), r.last_summary.clone()));
        SchedulerStatus {
            state: self.state(),
            tick: self.committed_tick.load(Ordering::Acquire),
            agents_alive: self.agents_alive.load(Ordering::Acquire),
            stop_reason,
            last_error,
            last_summary,
        }
    }

    /// A copy of the authoritative world. Waits for any tick in flight.
    pub async fn world(&self) -> WorldState {
        self.tick_state.lock().await.world.clone()
    }

    /// The event bus ticks publish to.
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The shared simulation context.
    pub const fn context(&self) -> &Arc<SimulationContext> {
        &self.ctx
    }

    fn require_stopped(&self, operation: &'static str) -> Result<(), SchedulerError> {
        let state = self.state();
        if state == SchedulerState::Stopped {
            Ok(())
        } else {
            Err(SchedulerError::InvalidTransition {
                from: state,
                operation,
            })
        }
    }

    async fn advance(&self, tick_state: &mut TickState) -> Result<TickSummary, TickError> {
        let TickState { world, recent } = tick_state;
        let outcome = run_tick(
            &self.ctx,
            world,
            self.world_store.as_ref(),
            self.scent_store.as_ref(),
            &self.bus,
            recent.as_slice(),
        )
        .await?;

        *world = outcome.world;
        recent.extend(outcome.events);
        self.committed_tick.store(world.tick, Ordering::Release);
        self.agents_alive
            .store(outcome.summary.agents_alive, Ordering::Release);
        self.with_report(|r| r.last_summary = Some(outcome.summary.clone()));
        Ok(outcome.summary)
    }

    /// Leave `running` on our own, unless someone else already moved us.
    fn halt(&self, reason: StopReason) {
        if self
            .transition(
                &[SchedulerState::Running, SchedulerState::Paused],
                SchedulerState::Stopped,
                "halt",
            )
            .is_ok()
        {
            self.with_report(|r| r.stop_reason = Some(reason));
        }
    }

    async fn run_loop(self: Arc<Self>) {
        let period = Duration::from_millis(self.ctx.config().world.tick_interval_ms.max(1));
        let max_ticks = self.ctx.config().world.max_ticks;
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            match self.state() {
                SchedulerState::Stopped => break,
                SchedulerState::Paused => {
                    self.wake.notified().await;
                    continue;
                }
                SchedulerState::Running => {}
            }

            tokio::select! {
                _ = interval.tick() => {}
                () = self.wake.notified() => continue,
            }
            if self.state() != SchedulerState::Running {
                continue;
            }

            let mut tick_state = self.tick_state.lock().await;
            match self.advance(&mut tick_state).await {
                Ok(summary) => {
                    if summary.agents_alive == 0 {
                        info!(tick = summary.tick, "All agents are dead, stopping");
                        self.halt(StopReason::Extinction);
                    } else if max_ticks.is_some_and(|max| summary.tick >= max) {
                        info!(tick = summary.tick, "Tick limit reached, stopping");
                        self.halt(StopReason::MaxTicks);
                    }
                }
                Err(e) => {
                    error!(
                        tick = tick_state.world.tick.saturating_add(1),
                        error = %e,
                        "Tick failed, stopping simulation"
                    );
                    self.with_report(|r| r.last_error = Some(e.to_string()));
                    self.halt(StopReason::Failed);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::genesis::create_world;
    use crate::store::{InMemoryScentStore, InMemoryWorldStore};

    fn scheduler(max_ticks: Option<u64>) -> (Arc<Scheduler>, Arc<InMemoryWorldStore>) {
        let mut config = SimulationConfig::default();
        config.world.size = 12;
        config.world.initial_agents = 4;
        config.world.tick_interval_ms = 10;
        config.world.max_ticks = max_ticks;
        let ctx = Arc::new(SimulationContext::new(config));
        let world = create_world(ctx.config(), ctx.rng()).unwrap();
        let store = Arc::new(InMemoryWorldStore::default());
        let scents = Arc::new(InMemoryScentStore::new(ctx.config().scent_settings()));
        let scheduler = Scheduler::new(
            ctx,
            world,
            Arc::clone(&store) as Arc<dyn WorldStore>,
            scents,
            EventBus::new(256),
        );
        (scheduler, store)
    }

    #[tokio::test]
    async fn invalid_transitions_are_refused() {
        let (scheduler, _) = scheduler(None);
        let err = scheduler.pause().unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidTransition {
                from: SchedulerState::Stopped,
                operation: "pause"
            }
        ));
        assert!(scheduler.resume().is_err());
        assert!(scheduler.stop().await.is_err());

        scheduler.start().await.unwrap();
        assert!(scheduler.start().await.is_err());
        assert!(scheduler.step().await.is_err());
        assert!(scheduler.reset(WorldState::new(12)).await.is_err());
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn step_runs_one_tick() {
        let (scheduler, store) = scheduler(None);
        let summary = scheduler.step().await.unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(scheduler.status().tick, 1);
        assert_eq!(store.committed_tick(), Some(1));
        scheduler.step().await.unwrap();
        assert_eq!(scheduler.world().await.tick, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume() {
        let (scheduler, _) = scheduler(None);
        scheduler.start().await.unwrap();
        scheduler.pause().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        scheduler.resume().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await.unwrap();
        let status = scheduler.status();
        assert_eq!(status.state, SchedulerState::Stopped);
        assert_eq!(status.stop_reason, Some(StopReason::Requested));
        assert!(status.tick >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_stops_at_the_tick_limit() {
        let (scheduler, _) = scheduler(Some(3));
        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let status = scheduler.status();
        assert_eq!(status.state, SchedulerState::Stopped);
        assert_eq!(status.tick, 3);
        assert_eq!(status.stop_reason, Some(StopReason::MaxTicks));
    }

    #[tokio::test(start_paused = true)]
    async fn store_failure_stops_the_loop() {
        let (scheduler, store) = scheduler(None);
        store.set_unavailable(true);
        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = scheduler.status();
        assert_eq!(status.state, SchedulerState::Stopped);
        assert_eq!(status.tick, 0);
        assert_eq!(status.stop_reason, Some(StopReason::Failed));
        assert!(status.last_error.unwrap().contains("unavailable"));
        assert!(matches!(
            scheduler.stop().await.unwrap_err(),
            SchedulerError::Halted(_)
        ));

        store.set_unavailable(false);
        scheduler.start().await.unwrap();
        assert!(scheduler.status().last_error.is_none());
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn reset_rewinds_to_zero() {
        let (scheduler, _) = scheduler(None);
        scheduler.step().await.unwrap();
        scheduler.step().await.unwrap();
        let mut fresh = WorldState::new(12);
        fresh.tick = 9;
        scheduler.reset(fresh).await.unwrap();
        let status = scheduler.status();
        assert_eq!(status.tick, 0);
        assert_eq!(status.agents_alive, 0);
        assert!(status.last_summary.is_none());
    }
}
