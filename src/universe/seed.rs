// src/universe/seed.rs
//! The agents listed when the exchange boots.
//
//! Eight agents across the three sectors. Every engine start (and every
//! reset) rebuilds them from these values; nothing here is persisted.

use crate::types::{Agent, Fundamentals, Sector};

pub const SEED_AGENT_COUNT: usize = 8;

#[inline]
fn scores(usage: f64, performance: f64, reliability: f64, risk: f64) -> Fundamentals {
    Fundamentals {
        usage,
        performance,
        reliability,
        risk,
    }
}

/// The universe of agents available when the market boots.
///
/// *Add or remove entries here to grow/shrink the simulation space.*
#[inline]
pub fn default_agent_universe() -> Vec<Agent> {
    vec![
        // ── FRAUD & AML ─────────────────────────────────────────────
        Agent::new(
            "fraudguard_v3",
            "FraudGuard-v3",
            Sector::FraudAml,
            scores(0.85, 0.78, 0.92, 0.35),
            0.08,   // inflow velocity
            5000.0, // backing
            142.50, // price at t=0
        ),
        Agent::new(
            "amlscan_pro",
            "AMLScan-Pro",
            Sector::FraudAml,
            scores(0.72, 0.81, 0.88, 0.42),
            0.03,
            3800.0,
            98.30,
        ),
        Agent::new(
            "txnmonitor",
            "TxnMonitor",
            Sector::FraudAml,
            scores(0.65, 0.70, 0.95, 0.28),
            -0.02,
            2900.0,
            76.00,
        ),
        // ── COMPLIANCE ──────────────────────────────────────────────
        Agent::new(
            "complibot_eu",
            "CompliBot-EU",
            Sector::Compliance,
            scores(0.90, 0.85, 0.90, 0.20),
            0.15,
            6500.0,
            210.00,
        ),
        Agent::new(
            "regwatch_us",
            "RegWatch-US",
            Sector::Compliance,
            scores(0.78, 0.82, 0.87, 0.25),
            0.06,
            4200.0,
            165.40,
        ),
        Agent::new(
            "sanctionscreen",
            "SanctionScreen",
            Sector::Compliance,
            scores(0.60, 0.75, 0.93, 0.30),
            0.01,
            2100.0,
            88.00,
        ),
        // ── GEO / OSINT ─────────────────────────────────────────────
        Agent::new(
            "geointel_live",
            "GeoIntel-Live",
            Sector::GeoOsint,
            scores(0.70, 0.68, 0.80, 0.55),
            -0.05,
            1800.0,
            55.20,
        ),
        Agent::new(
            "threatmapper",
            "ThreatMapper",
            Sector::GeoOsint,
            scores(0.55, 0.62, 0.75, 0.60),
            -0.08,
            1400.0,
            42.80,
        ),
    ]
}

// -----------------------------------------------------------------------------
//  Unit tests: seed universe invariants
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_universe_is_consistent() {
        let agents = default_agent_universe();
        assert_eq!(agents.len(), SEED_AGENT_COUNT);

        let ids: HashSet<&str> = agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), SEED_AGENT_COUNT, "ids must be unique");

        for sector in Sector::ALL {
            assert!(agents.iter().any(|a| a.sector == sector), "{sector} has no agents");
        }
    }

    #[test]
    fn seed_values_respect_bounds() {
        for a in default_agent_universe() {
            let f = a.fundamentals;
            for score in [f.usage, f.performance, f.reliability, f.risk] {
                assert!((0.0..=1.0).contains(&score));
            }
            assert!((-1.0..=1.0).contains(&a.inflow_velocity));
            assert!(a.total_backing >= 1.0);
            assert!(a.price >= 1.0);
        }
    }

    #[test]
    fn fraudguard_is_seeded_at_documented_price() {
        let agents = default_agent_universe();
        let fg = agents.iter().find(|a| a.id == "fraudguard_v3").unwrap();
        assert_eq!(fg.price, 142.50);
        assert_eq!(fg.total_backing, 5000.0);
    }
}
