// src/shocks/propagation.rs

//! Lifecycle of the active-shock list: injection, per-tick impact
//! aggregation and decay/expiry.
//!
//! Within one tick the order is fixed: impacts are computed from the
//! pre-decrement `ticks_remaining`, then every counter is decremented and
//! expired shocks are dropped.

use std::collections::BTreeMap;

use super::betas::BetaMatrix;
use crate::error::EngineError;
use crate::types::{Agent, SHOCK_LIFETIME_TICKS, Shock, ShockRequest, ShockType};

/// How an unspecified severity is filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityPolicy {
    /// Use the per-type demo severities instead of the single fallback.
    pub deterministic: bool,
    pub fallback: f64,
}

impl SeverityPolicy {
    /// Resolves and clamps the severity of an injection. Finite values outside
    /// [0, 1] are clamped; NaN and infinities are rejected.
    pub fn resolve(&self, shock_type: ShockType, requested: Option<f64>) -> Result<f64, EngineError> {
        let severity = match requested {
            Some(s) if !s.is_finite() => return Err(EngineError::InvalidSeverity(s)),
            Some(s) => s,
            None if self.deterministic => shock_type.demo_severity(),
            None => self.fallback,
        };
        Ok(severity.clamp(0.0, 1.0))
    }
}

/// Materializes a validated request into a fresh shock with a full lifetime.
pub fn build_shock(request: ShockRequest, severity: f64, id: String, timestamp: f64) -> Shock {
    let description = request
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| request.shock_type.default_description().to_string());
    Shock {
        id,
        shock_type: request.shock_type,
        severity,
        description,
        source: request.source,
        timestamp,
        ticks_remaining: SHOCK_LIFETIME_TICKS,
    }
}

/// Sums the clamped, decayed impact of every active shock per agent id.
/// Agents untouched by any shock still get an entry of 0.0.
pub fn aggregate_impacts<'a, I>(shocks: &[Shock], agents: I, betas: &BetaMatrix) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a Agent>,
{
    agents
        .into_iter()
        .map(|agent| {
            let total = shocks
                .iter()
                .filter(|s| !s.is_expired())
                .map(|s| betas.impact(s.shock_type, s.severity, agent.sector, s.ticks_remaining))
                .sum::<f64>();
            (agent.id.clone(), total)
        })
        .collect()
}

/// Ages every shock by one tick and drops the expired ones.
/// Returns how many shocks expired.
pub fn decay_shocks(shocks: &mut Vec<Shock>) -> usize {
    for shock in shocks.iter_mut() {
        shock.ticks_remaining = shock.ticks_remaining.saturating_sub(1);
    }
    let before = shocks.len();
    shocks.retain(|s| !s.is_expired());
    before - shocks.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shocks::MAX_TICK_IMPACT;
    use crate::types::{Fundamentals, Sector};

    fn shock(shock_type: ShockType, severity: f64) -> Shock {
        build_shock(ShockRequest::new(shock_type), severity, "s".into(), 0.0)
    }

    fn agent(id: &str, sector: Sector) -> Agent {
        Agent::new(id, id, sector, Fundamentals::default(), 0.0, 100.0, 10.0)
    }

    #[test]
    fn unspecified_severity_uses_policy() {
        let demo = SeverityPolicy { deterministic: true, fallback: 0.65 };
        let live = SeverityPolicy { deterministic: false, fallback: 0.65 };
        assert_eq!(demo.resolve(ShockType::FxShock, None).unwrap(), 0.50);
        assert_eq!(live.resolve(ShockType::FxShock, None).unwrap(), 0.65);
    }

    #[test]
    fn severity_is_clamped_not_rejected() {
        let p = SeverityPolicy { deterministic: false, fallback: 0.65 };
        assert_eq!(p.resolve(ShockType::Cyber, Some(1.5)).unwrap(), 1.0);
        assert_eq!(p.resolve(ShockType::Cyber, Some(-0.2)).unwrap(), 0.0);
        assert!(matches!(
            p.resolve(ShockType::Cyber, Some(f64::NAN)),
            Err(EngineError::InvalidSeverity(_))
        ));
    }

    #[test]
    fn new_shock_gets_default_description_and_full_life() {
        let s = shock(ShockType::Earthquake, 0.5);
        assert_eq!(s.ticks_remaining, 4);
        assert_eq!(s.description, ShockType::Earthquake.default_description());
        assert_eq!(s.source, "manual");
    }

    #[test]
    fn shock_expires_after_exactly_four_decays() {
        let mut shocks = vec![shock(ShockType::Cyber, 0.6)];
        for expected_left in [3, 2, 1] {
            assert_eq!(decay_shocks(&mut shocks), 0);
            assert_eq!(shocks[0].ticks_remaining, expected_left);
        }
        assert_eq!(decay_shocks(&mut shocks), 1);
        assert!(shocks.is_empty());
    }

    #[test]
    fn impacts_accumulate_across_simultaneous_shocks() {
        let agents = [agent("c", Sector::Compliance), agent("g", Sector::GeoOsint)];
        let shocks = vec![shock(ShockType::Regulation, 0.1), shock(ShockType::Sanctions, 0.1)];
        let betas = BetaMatrix::default();
        let impacts = aggregate_impacts(&shocks, agents.iter(), &betas);

        // 0.1*0.8 + 0.1*0.7
        assert!((impacts["c"] - 0.15).abs() < 1e-12);
        // 0.1*-0.2 + 0.1*0.5
        assert!((impacts["g"] - 0.03).abs() < 1e-12);
    }

    #[test]
    fn each_contribution_is_clamped_before_summing() {
        let agents = [agent("c", Sector::Compliance)];
        let shocks = vec![shock(ShockType::Regulation, 1.0), shock(ShockType::Sanctions, 1.0)];
        let impacts = aggregate_impacts(&shocks, agents.iter(), &BetaMatrix::default());
        assert!((impacts["c"] - 2.0 * MAX_TICK_IMPACT).abs() < 1e-12);
    }

    #[test]
    fn impact_uses_pre_decrement_counter() {
        let agents = [agent("c", Sector::Compliance)];
        let betas = BetaMatrix::default();
        let mut shocks = vec![shock(ShockType::Regulation, 0.1)];
        let mut seen = Vec::new();
        while !shocks.is_empty() {
            seen.push(aggregate_impacts(&shocks, agents.iter(), &betas)["c"]);
            decay_shocks(&mut shocks);
        }
        let expected = [0.08, 0.048, 0.024, 0.008];
        assert_eq!(seen.len(), 4);
        for (got, want) in seen.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }
}
