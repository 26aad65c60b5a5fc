// src/observers.rs

//! Tick observers: callbacks handed the post-tick snapshot.
//!
//! Observers run after the tick has been committed and the state lock has
//! been released. They only ever see an owned [`MarketSnapshot`], so nothing
//! they do can reach back into the market.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::error::ObserverResult;
use crate::types::MarketSnapshot;

pub trait TickObserver: Send + Sync {
    /// Used in log lines when the observer fails.
    fn name(&self) -> &str;

    fn on_tick(&self, snapshot: &MarketSnapshot) -> ObserverResult;
}

/// Wraps a closure as an observer.
pub struct FnObserver<F> {
    name: String,
    f: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&MarketSnapshot) -> ObserverResult + Send + Sync,
{
    pub fn new<T: Into<String>>(name: T, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> TickObserver for FnObserver<F>
where
    F: Fn(&MarketSnapshot) -> ObserverResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_tick(&self, snapshot: &MarketSnapshot) -> ObserverResult {
        (self.f)(snapshot)
    }
}

/// Warns when cascade probability crosses the threshold on the way up.
pub struct CascadeAlert {
    threshold: f64,
    above: Mutex<bool>,
    fired: AtomicU64,
}

impl CascadeAlert {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            above: Mutex::new(false),
            fired: AtomicU64::new(0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// How many upward crossings have been seen.
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }
}

impl TickObserver for CascadeAlert {
    fn name(&self) -> &str {
        "cascade_alert"
    }

    fn on_tick(&self, snapshot: &MarketSnapshot) -> ObserverResult {
        let now_above = snapshot.cascade_probability > self.threshold;
        let mut above = self.above.lock();
        if now_above && !*above {
            self.fired.fetch_add(1, Ordering::Relaxed);
            warn!(
                tick = snapshot.tick_number,
                cascade_probability = snapshot.cascade_probability,
                threshold = self.threshold,
                "cascade probability crossed threshold"
            );
        }
        *above = now_above;
        Ok(())
    }
}

/// Keeps the most recent `capacity` snapshots.
pub struct SnapshotRecorder {
    capacity: usize,
    buf: Mutex<VecDeque<MarketSnapshot>>,
}

impl SnapshotRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buf: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    pub fn latest(&self) -> Option<MarketSnapshot> {
        self.buf.lock().back().cloned()
    }

    /// Oldest first.
    pub fn snapshots(&self) -> Vec<MarketSnapshot> {
        self.buf.lock().iter().cloned().collect()
    }

    /// Price series of one agent across the recorded snapshots, oldest first.
    pub fn price_series(&self, agent_id: &str) -> Vec<(u64, f64)> {
        self.buf
            .lock()
            .iter()
            .filter_map(|s| s.agent(agent_id).map(|a| (s.tick_number, a.price)))
            .collect()
    }

    pub fn clear(&self) {
        self.buf.lock().clear();
    }
}

impl TickObserver for SnapshotRecorder {
    fn name(&self) -> &str {
        "snapshot_recorder"
    }

    fn on_tick(&self, snapshot: &MarketSnapshot) -> ObserverResult {
        let mut buf = self.buf.lock();
        while buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tick: u64, cascade: f64) -> MarketSnapshot {
        MarketSnapshot {
            tick_number: tick,
            total_market_cap: 0.0,
            cascade_probability: cascade,
            peak_market_cap: 0.0,
            drawdown_pct: 0.0,
            active_shocks: vec![],
            agents: vec![],
            sectors: vec![],
        }
    }

    #[test]
    fn cascade_alert_fires_on_upward_crossings_only() {
        let alert = CascadeAlert::new(0.5);
        for (tick, p) in [0.2, 0.6, 0.7, 0.5, 0.4, 0.9].into_iter().enumerate() {
            alert.on_tick(&snapshot(tick as u64, p)).unwrap();
        }
        assert_eq!(alert.fired(), 2);
    }

    #[test]
    fn recorder_is_bounded() {
        let rec = SnapshotRecorder::new(3);
        for tick in 1..=5 {
            rec.on_tick(&snapshot(tick, 0.0)).unwrap();
        }
        let ticks: Vec<u64> = rec.snapshots().iter().map(|s| s.tick_number).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
        assert_eq!(rec.latest().unwrap().tick_number, 5);
        rec.clear();
        assert!(rec.is_empty());
    }

    #[test]
    fn fn_observer_forwards_errors() {
        let obs = FnObserver::new("boom", |_s: &MarketSnapshot| Err("dashboard down".into()));
        assert_eq!(obs.name(), "boom");
        let err = obs.on_tick(&snapshot(1, 0.0)).unwrap_err();
        assert_eq!(err.to_string(), "dashboard down");
    }
}
