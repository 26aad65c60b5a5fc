// src/lib.rs

// === 1. Declare all the top-level modules ===
pub mod config;
pub mod engine;
pub mod error;
pub mod observers;
pub mod pricing;
pub mod scheduler;
pub mod shocks;
pub mod simulators;
pub mod types;
pub mod universe;

// === 2. Re-export the public-facing components to create a clean API ===

// --- The engine handle and its configuration ---
pub use config::{EngineConfig, PricingParams};
pub use engine::{EngineStatus, MarketEngine};
pub use error::{ConfigError, EngineError, ObserverResult, ReplayError, TickError};
pub use scheduler::SchedulerState;

// --- From `observers` ---
pub use observers::{CascadeAlert, FnObserver, SnapshotRecorder, TickObserver};

// --- From `simulators` ---
pub use simulators::{Marketable, Simulation, TickOutcome};

// --- From `shocks` ---
pub use shocks::{BetaMatrix, SignalEvent, convert_signal, load_signals};

// --- From `pricing` ---
pub use pricing::{PricingModel, cascade_probability};

// --- From `types` ---
pub use types::{
    Agent, AgentView, Flow, Fundamentals, FundamentalsUpdate, HistoryMode, MarketSnapshot,
    MarketState, Sector, SectorSummary, Shock, ShockRequest, ShockType, ShockView, Side,
};
