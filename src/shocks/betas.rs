// src/shocks/betas.rs

//! Sector sensitivities to each shock type.
//!
//! Positive betas mean the sector benefits from the shock, negative means it
//! suffers. This is configuration, not logic: the engine takes a
//! [`BetaMatrix`] in its config and the default below can be swapped out
//! wholesale (e.g. loaded from JSON) without touching the tick code.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::{SHOCK_LIFETIME_TICKS, Sector, ShockType};

/// Bound on any single shock/sector contribution in one tick.
pub const MAX_TICK_IMPACT: f64 = 0.15;

/// Fraction of the original impact applied on each tick of a shock's life.
pub const DECAY_SCHEDULE: [f64; SHOCK_LIFETIME_TICKS as usize] = [1.0, 0.6, 0.3, 0.1];

static DEFAULT_BETAS: Lazy<BetaMatrix> = Lazy::new(|| {
    use Sector::*;
    use ShockType::*;

    let rows: [(ShockType, [(Sector, f64); 3]); 5] = [
        // tighter rules hurt fraud detection, compliance wins
        (Regulation, [(FraudAml, -0.60), (Compliance, 0.80), (GeoOsint, -0.20)]),
        // cyber incidents drive demand for fraud and threat-tracking agents
        (Cyber, [(FraudAml, 0.50), (Compliance, -0.30), (GeoOsint, 0.70)]),
        (FxShock, [(FraudAml, -0.40), (Compliance, -0.20), (GeoOsint, -0.30)]),
        // disasters mean demand for geo intel
        (Earthquake, [(FraudAml, -0.20), (Compliance, -0.10), (GeoOsint, 0.60)]),
        (Sanctions, [(FraudAml, 0.30), (Compliance, 0.70), (GeoOsint, 0.50)]),
    ];

    let mut matrix = BetaMatrix::empty();
    for (shock_type, row) in rows {
        for (sector, beta) in row {
            matrix.set_beta(shock_type, sector, beta);
        }
    }
    matrix
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaMatrix {
    betas: BTreeMap<ShockType, BTreeMap<Sector, f64>>,
    #[serde(default = "default_decay")]
    decay_schedule: [f64; SHOCK_LIFETIME_TICKS as usize],
    #[serde(default = "default_max_impact")]
    max_tick_impact: f64,
}

fn default_decay() -> [f64; SHOCK_LIFETIME_TICKS as usize] {
    DECAY_SCHEDULE
}

fn default_max_impact() -> f64 {
    MAX_TICK_IMPACT
}

impl Default for BetaMatrix {
    fn default() -> Self {
        DEFAULT_BETAS.clone()
    }
}

impl BetaMatrix {
    /// A matrix where every combination has beta 0.0.
    pub fn empty() -> Self {
        Self {
            betas: BTreeMap::new(),
            decay_schedule: DECAY_SCHEDULE,
            max_tick_impact: MAX_TICK_IMPACT,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Sensitivity of `sector` to `shock_type`; 0.0 for unlisted combinations.
    pub fn beta(&self, shock_type: ShockType, sector: Sector) -> f64 {
        self.betas
            .get(&shock_type)
            .and_then(|row| row.get(&sector))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_beta(&mut self, shock_type: ShockType, sector: Sector, beta: f64) {
        self.betas.entry(shock_type).or_default().insert(sector, beta);
    }

    pub fn with_max_tick_impact(mut self, max_tick_impact: f64) -> Self {
        self.max_tick_impact = max_tick_impact.abs();
        self
    }

    pub fn max_tick_impact(&self) -> f64 {
        self.max_tick_impact
    }

    pub fn decay_schedule(&self) -> &[f64; SHOCK_LIFETIME_TICKS as usize] {
        &self.decay_schedule
    }

    /// Decay multiplier for a shock with `ticks_remaining` left, indexed by
    /// how many ticks it has already been applied.
    pub fn decay_multiplier(&self, ticks_remaining: u32) -> f64 {
        let last = self.decay_schedule.len() - 1;
        let index = (SHOCK_LIFETIME_TICKS.saturating_sub(ticks_remaining) as usize).min(last);
        self.decay_schedule[index]
    }

    /// One shock's clamped contribution to one agent's price change this tick.
    pub fn impact(&self, shock_type: ShockType, severity: f64, sector: Sector, ticks_remaining: u32) -> f64 {
        let raw = severity.clamp(0.0, 1.0)
            * self.beta(shock_type, sector)
            * self.decay_multiplier(ticks_remaining);
        raw.clamp(-self.max_tick_impact, self.max_tick_impact)
    }
}
