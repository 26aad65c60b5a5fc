// src/engine.rs

//! `MarketEngine`: the handle everything outside the crate talks to.
//!
//! The simulation sits behind a single-writer/many-reader lock. A tick holds
//! the write lock only while computing and committing; the snapshot handed to
//! observers is taken before the lock is released and observers run after it.
//!
//! Clones of a `MarketEngine` share the same market. The tick thread holds
//! only a weak reference, so dropping the last handle also ends the thread.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, ObserverResult, TickError};
use crate::observers::{FnObserver, TickObserver};
use crate::scheduler::{SchedulerState, Worker};
use crate::shocks::{SignalEvent, convert_signal};
use crate::simulators::{Marketable, Simulation};
use crate::types::{
    Agent, AgentView, Flow, FundamentalsUpdate, HistoryMode, MarketSnapshot, ShockRequest,
    ShockView,
};

/// Answer to the health query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: SchedulerState,
    pub tick_number: u64,
    pub agent_count: usize,
    pub active_shock_count: usize,
    /// Wall time of the last successful tick's computation, observers excluded.
    pub last_tick_latency_ms: Option<f64>,
    pub failed_ticks: u64,
}

struct Inner {
    config: EngineConfig,
    sim: RwLock<Simulation>,
    observers: RwLock<Vec<Arc<dyn TickObserver>>>,
    worker: Mutex<Option<Worker>>,
    // Serializes whole ticks (computation + dispatch) so observers see
    // snapshots in tick order even when tick_once races the scheduler.
    tick_gate: Mutex<()>,
    // Thread holding tick_gate, so a tick requested from an observer fails
    // instead of locking the gate a second time.
    gate_owner: Mutex<Option<ThreadId>>,
    last_latency_us: AtomicU64,
    failed_ticks: AtomicU64,
}

#[derive(Clone)]
pub struct MarketEngine {
    inner: Arc<Inner>,
}

impl MarketEngine {
    /// Engine over the default eight-agent universe. Starts stopped.
    pub fn new(config: EngineConfig) -> Self {
        let sim = Simulation::new(&config);
        Self::from_simulation(config, sim)
    }

    pub fn with_agents(config: EngineConfig, agents: Vec<Agent>) -> Self {
        let sim = Simulation::with_agents(&config, agents);
        Self::from_simulation(config, sim)
    }

    fn from_simulation(config: EngineConfig, sim: Simulation) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sim: RwLock::new(sim),
                observers: RwLock::new(Vec::new()),
                worker: Mutex::new(None),
                tick_gate: Mutex::new(()),
                gate_owner: Mutex::new(None),
                last_latency_us: AtomicU64::new(u64::MAX),
                failed_ticks: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ── scheduler ───────────────────────────────────────────────────

    /// Starts the tick thread. Calling it while already running does nothing.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut slot = self.inner.worker.lock();
        if slot.is_some() {
            debug!("start() while running, ignoring");
            return Ok(());
        }
        let interval = self.inner.config.tick_interval;
        let worker = Worker::spawn(Arc::downgrade(&self.inner), interval, Inner::scheduled_tick)
        .map_err(EngineError::Spawn)?;
        *slot = Some(worker);
        info!(
            interval_ms = interval.as_millis() as u64,
            deterministic = self.inner.config.deterministic,
            "market engine started"
        );
        Ok(())
    }

    /// Stops the tick thread. Once this returns no further tick will start.
    /// Safe to call at any time, including from an observer.
    pub fn stop(&self) {
        // release the slot before joining: the worker may be inside an
        // observer that queries is_running()
        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            worker.stop();
            info!("market engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.worker.lock().is_some()
    }

    pub fn state(&self) -> SchedulerState {
        if self.is_running() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    // ── observers ───────────────────────────────────────────────────

    /// Registers an observer. Observers run in registration order.
    pub fn on_tick(&self, observer: Arc<dyn TickObserver>) {
        self.inner.observers.write().push(observer);
    }

    pub fn on_tick_fn<T, F>(&self, name: T, f: F)
    where
        T: Into<String>,
        F: Fn(&MarketSnapshot) -> ObserverResult + Send + Sync + 'static,
    {
        self.on_tick(Arc::new(FnObserver::new(name, f)));
    }

    /// Runs one full tick on the calling thread, observers included.
    ///
    /// Waits for a tick already in progress on another thread. Called from
    /// inside a tick observer it returns [`TickError::Reentrant`].
    pub fn tick_once(&self) -> Result<MarketSnapshot, TickError> {
        self.inner.tick()
    }

    // ── commands ────────────────────────────────────────────────────

    pub fn inject_shock(&self, request: ShockRequest) -> Result<ShockView, EngineError> {
        self.inner.sim.write().inject_shock(request)
    }

    /// Converts an external signal and injects the result. `None` when the
    /// signal is too weak or maps to no shock type.
    pub fn ingest_signal(&self, signal: &SignalEvent) -> Option<ShockView> {
        let request = convert_signal(signal)?;
        match self.inject_shock(request) {
            Ok(view) => Some(view),
            Err(err) => {
                warn!(signal_id = %signal.id, error = %err, "signal rejected");
                None
            }
        }
    }

    pub fn simulate_buy(&self, agent_id: &str, amount: f64) -> Result<(), EngineError> {
        self.apply_flow(agent_id, Flow::buy(validate_amount(amount)?));
        Ok(())
    }

    pub fn simulate_sell(&self, agent_id: &str, amount: f64) -> Result<(), EngineError> {
        self.apply_flow(agent_id, Flow::sell(validate_amount(amount)?));
        Ok(())
    }

    fn apply_flow(&self, agent_id: &str, flow: Flow) {
        if !self.inner.sim.write().apply_flow(agent_id, flow) {
            debug!(agent_id, side = ?flow.side, "flow for unknown agent ignored");
        }
    }

    /// Overwrites fundamentals; the next tick prices the change.
    pub fn update_fundamentals(&self, agent_id: &str, update: FundamentalsUpdate) {
        if !self.inner.sim.write().update_fundamentals(agent_id, &update) {
            debug!(agent_id, "fundamentals update for unknown agent ignored");
        }
    }

    /// Back to seed values, as after a restart. Observers and the scheduler
    /// are left alone.
    pub fn reset(&self) {
        self.inner.sim.write().reset();
        info!("market reset to seed state");
    }

    // ── queries ─────────────────────────────────────────────────────

    pub fn get_snapshot(&self, mode: HistoryMode) -> MarketSnapshot {
        self.inner.sim.read().snapshot(mode)
    }

    pub fn get_agents(&self) -> Vec<AgentView> {
        self.inner.sim.read().agent_views(HistoryMode::Include)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<AgentView, EngineError> {
        self.inner
            .sim
            .read()
            .state()
            .agent(agent_id)
            .map(|a| a.view(HistoryMode::Include))
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))
    }

    pub fn status(&self) -> EngineStatus {
        let (tick_number, agent_count, active_shock_count) = {
            let sim = self.inner.sim.read();
            let state = sim.state();
            (state.tick_number, state.agents.len(), state.active_shocks.len())
        };
        let latency = self.inner.last_latency_us.load(Ordering::Relaxed);
        EngineStatus {
            state: self.state(),
            tick_number,
            agent_count,
            active_shock_count,
            last_tick_latency_ms: (latency != u64::MAX).then(|| latency as f64 / 1_000.0),
            failed_ticks: self.inner.failed_ticks.load(Ordering::Relaxed),
        }
    }
}

impl Inner {
    /// Tick fired by the worker. Skipped while another thread is mid-tick:
    /// that thread's observers may be waiting to join this one.
    fn scheduled_tick(&self) {
        match self.tick_gate.try_lock() {
            // failures are already logged and counted
            Some(gate) => {
                let _ = self.tick_locked(gate);
            }
            None => debug!("tick already in progress, skipping scheduled tick"),
        }
    }

    fn tick(&self) -> Result<MarketSnapshot, TickError> {
        if *self.gate_owner.lock() == Some(thread::current().id()) {
            warn!("tick requested from inside a tick observer, refusing");
            return Err(TickError::Reentrant);
        }
        let gate = self.tick_gate.lock();
        self.tick_locked(gate)
    }

    fn tick_locked(&self, _gate: MutexGuard<'_, ()>) -> Result<MarketSnapshot, TickError> {
        // cleared before the gate guard drops
        let _owner = GateOwner::claim(&self.gate_owner);
        let started = Instant::now();

        let computed = catch_unwind(AssertUnwindSafe(|| {
            let mut sim = self.sim.write();
            sim.step().map(|_| sim.snapshot(HistoryMode::Include))
        }))
        .unwrap_or_else(|payload| Err(TickError::Panicked(panic_message(payload.as_ref()))));

        let snapshot = match computed {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.failed_ticks.fetch_add(1, Ordering::Relaxed);
                error!(error = %err, "tick failed, market state unchanged");
                return Err(err);
            }
        };
        self.last_latency_us
            .store(started.elapsed().as_micros() as u64, Ordering::Relaxed);

        self.dispatch(&snapshot);
        Ok(snapshot)
    }

    fn dispatch(&self, snapshot: &MarketSnapshot) {
        // clone the list so observers may register others without deadlocking
        let observers: Vec<Arc<dyn TickObserver>> = self.observers.read().clone();
        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_tick(snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    observer = observer.name(),
                    tick = snapshot.tick_number,
                    error = %err,
                    "tick observer failed"
                ),
                Err(payload) => error!(
                    observer = observer.name(),
                    tick = snapshot.tick_number,
                    panic = %panic_message(payload.as_ref()),
                    "tick observer panicked"
                ),
            }
        }
    }
}

/// Records the current thread as the tick gate holder until dropped.
struct GateOwner<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> GateOwner<'a> {
    fn claim(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *slot.lock() = Some(thread::current().id());
        Self(slot)
    }
}

impl Drop for GateOwner<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

fn validate_amount(amount: f64) -> Result<f64, EngineError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(EngineError::InvalidAmount(amount))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
