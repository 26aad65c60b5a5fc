// src/pricing/cascade.rs

//! Heuristic systemic-risk signal, recomputed once per tick.

use crate::types::{Agent, Shock, round_to};

pub const VOLATILITY_WEIGHT: f64 = 10.0;
pub const SEVERITY_WEIGHT: f64 = 0.3;

/// `min(1, avg_volatility * 10 + total_severity * 0.3)`, rounded to 4 places.
pub fn cascade_from_parts(avg_volatility: f64, total_severity: f64) -> f64 {
    let raw = avg_volatility * VOLATILITY_WEIGHT + total_severity * SEVERITY_WEIGHT;
    if !raw.is_finite() {
        return 1.0;
    }
    round_to(raw.clamp(0.0, 1.0), 4)
}

pub fn cascade_probability<'a, I>(agents: I, active_shocks: &[Shock]) -> f64
where
    I: IntoIterator<Item = &'a Agent>,
{
    let (vol_sum, count) = agents
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), a| (sum + a.volatility, n + 1));
    let avg_volatility = vol_sum / count.max(1) as f64;
    let total_severity: f64 = active_shocks.iter().map(|s| s.severity).sum();
    cascade_from_parts(avg_volatility, total_severity)
}
