// src/types/mod.rs
// -----------------
use std::time::{SystemTime, UNIX_EPOCH};

pub mod agent;
pub mod flow;
pub mod market;
pub mod shock;
pub mod snapshot;

// Re-export the most useful items so callers don’t have to dive
// another level down the path.
pub use agent::{Agent, AgentView, Fundamentals, FundamentalsUpdate, InflowDirection, Sector};
pub use flow::{Flow, Side};
pub use market::MarketState;
pub use shock::{SHOCK_LIFETIME_TICKS, Shock, ShockRequest, ShockType, ShockView};
pub use snapshot::{HistoryMode, MarketSnapshot, SectorSummary};

/// Wall-clock seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Rounds `value` to `decimals` places for the wire shape.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
