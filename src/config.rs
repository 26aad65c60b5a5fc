// src/config.rs

//! A centralized place for tuning engine behaviour.
//!
//! Every weight the pricing model uses lives here as a constant, and
//! [`PricingParams`] / [`EngineConfig`] carry them into the engine so tests
//! and embedders can override any of them without touching the tick code.

use std::time::Duration;

use crate::error::ConfigError;
use crate::shocks::betas::BetaMatrix;

// --- Pricing weights ---
pub const ALPHA: f64 = 0.15; // inflow velocity
pub const BETA: f64 = 0.10; // performance delta
pub const GAMMA: f64 = 0.12; // risk delta
pub const NOISE_STD: f64 = 0.005;
pub const PRICE_FLOOR: f64 = 1.0;
pub const INFLOW_DECAY: f64 = 0.95;
pub const HISTORY_WINDOW: usize = 20;

// --- Passive flows ---
// Small synthetic buys/sells that keep the market moving when nobody trades.
pub const PASSIVE_FLOW_PROB: f64 = 0.15;
pub const PASSIVE_FLOW_MIN: f64 = 10.0;
pub const PASSIVE_FLOW_MAX: f64 = 80.0;
pub const PASSIVE_SELL_FACTOR: f64 = 0.5;

// --- Capital ---
pub const MIN_BACKING: f64 = 1.0;

// --- Engine ---
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2_000;
pub const DEMO_SEED: u64 = 42;
pub const FALLBACK_SEVERITY: f64 = 0.65;
pub const CASCADE_ALERT_THRESHOLD: f64 = 0.5;

/// Environment variable holding the tick interval in milliseconds.
pub const ENV_TICK_INTERVAL: &str = "MARKET_TICK_INTERVAL_MS";
/// Environment variable switching on deterministic (demo) mode.
pub const ENV_DEMO_MODE: &str = "DEMO_MODE";

/// Tunable constants of the per-agent price update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub noise_std: f64,
    pub price_floor: f64,
    pub inflow_decay: f64,
    pub history_window: usize,
    pub passive_flow_prob: f64,
    pub passive_flow_min: f64,
    pub passive_flow_max: f64,
    pub passive_sell_factor: f64,
}

impl Default for PricingParams {
    fn default() -> Self {
        Self {
            alpha: ALPHA,
            beta: BETA,
            gamma: GAMMA,
            noise_std: NOISE_STD,
            price_floor: PRICE_FLOOR,
            inflow_decay: INFLOW_DECAY,
            history_window: HISTORY_WINDOW,
            passive_flow_prob: PASSIVE_FLOW_PROB,
            passive_flow_min: PASSIVE_FLOW_MIN,
            passive_flow_max: PASSIVE_FLOW_MAX,
            passive_sell_factor: PASSIVE_SELL_FACTOR,
        }
    }
}

/// Everything the engine needs at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tick_interval: Duration,
    /// Seeds all randomness from `seed` and forces the per-type demo
    /// severities for injections that leave severity unspecified.
    pub deterministic: bool,
    pub seed: u64,
    pub default_severity: f64,
    pub cascade_alert_threshold: f64,
    pub pricing: PricingParams,
    pub betas: BetaMatrix,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            deterministic: false,
            seed: DEMO_SEED,
            default_severity: FALLBACK_SEVERITY,
            cascade_alert_threshold: CASCADE_ALERT_THRESHOLD,
            pricing: PricingParams::default(),
            betas: BetaMatrix::default(),
        }
    }
}

impl EngineConfig {
    /// Deterministic configuration with the demo seed. This is what tests use.
    pub fn deterministic() -> Self {
        Self {
            deterministic: true,
            ..Self::default()
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.deterministic = true;
        self.seed = seed;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingParams) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_betas(mut self, betas: BetaMatrix) -> Self {
        self.betas = betas;
        self
    }

    /// Reads `MARKET_TICK_INTERVAL_MS` and `DEMO_MODE` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] but with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_TICK_INTERVAL) {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidInterval(raw.clone()))?;
            if ms == 0 {
                return Err(ConfigError::ZeroInterval);
            }
            cfg.tick_interval = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(ENV_DEMO_MODE) {
            cfg.deterministic = matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes");
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.tick_interval, Duration::from_millis(2_000));
        assert!(!cfg.deterministic);
        assert_eq!(cfg.pricing.alpha, 0.15);
        assert_eq!(cfg.pricing.history_window, 20);
    }

    #[test]
    fn env_overrides_interval_and_demo_mode() {
        let cfg = EngineConfig::from_lookup(lookup_from(&[
            ("MARKET_TICK_INTERVAL_MS", "250"),
            ("DEMO_MODE", "Yes"),
        ]))
        .unwrap();
        assert_eq!(cfg.tick_interval, Duration::from_millis(250));
        assert!(cfg.deterministic);
    }

    #[test]
    fn demo_mode_rejects_unknown_words() {
        let cfg = EngineConfig::from_lookup(lookup_from(&[("DEMO_MODE", "sure")])).unwrap();
        assert!(!cfg.deterministic);
    }

    #[test]
    fn bad_interval_is_a_config_error() {
        let err = EngineConfig::from_lookup(lookup_from(&[("MARKET_TICK_INTERVAL_MS", "fast")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval(_)));

        let err = EngineConfig::from_lookup(lookup_from(&[("MARKET_TICK_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroInterval));
    }
}
