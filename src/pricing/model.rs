// src/pricing/model.rs

//! The per-tick price update of a single agent.
//!
//! ```text
//! delta     = ALPHA*inflow + BETA*performance_delta - GAMMA*risk_delta + shock + noise
//! new_price = max(floor, price * (1 + delta))
//! ```
//!
//! The fundamentals deltas are measured against the baseline captured at
//! the end of the previous tick, so they are zero unless something outside
//! the engine rewrote the fundamentals in between.

use rand::Rng;
use rand_distr::StandardNormal;

use super::volatility::rolling_volatility;
use crate::config::PricingParams;
use crate::error::TickError;
use crate::types::{Agent, Flow, Fundamentals};

/// What happened to one agent during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceUpdate {
    pub old_price: f64,
    pub new_price: f64,
    pub delta: f64,
    pub noise: f64,
    pub passive_flow: Option<Flow>,
}

#[derive(Debug, Clone, Copy)]
pub struct PricingModel {
    params: PricingParams,
}

impl PricingModel {
    pub fn new(params: PricingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PricingParams {
        &self.params
    }

    /// Relative price change before flooring. Pure.
    pub fn delta(&self, agent: &Agent, baseline: &Fundamentals, shock_impact: f64, noise: f64) -> f64 {
        let performance_delta = agent.fundamentals.performance - baseline.performance;
        let risk_delta = agent.fundamentals.risk - baseline.risk;
        self.params.alpha * agent.inflow_velocity + self.params.beta * performance_delta
            - self.params.gamma * risk_delta
            + shock_impact
            + noise
    }

    pub fn sample_noise<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        z * self.params.noise_std.max(0.0)
    }

    /// Runs one agent through a tick: price, history, market cap, volatility,
    /// inflow decay and finally the passive-flow draw. The agent is left
    /// untouched if the computed price is not finite.
    pub fn update_agent<R: Rng + ?Sized>(
        &self,
        agent: &mut Agent,
        baseline: &Fundamentals,
        shock_impact: f64,
        tick: u64,
        rng: &mut R,
    ) -> Result<PriceUpdate, TickError> {
        let noise = self.sample_noise(rng);
        let delta = self.delta(agent, baseline, shock_impact, noise);
        let old_price = agent.price;
        let new_price = (old_price * (1.0 + delta)).max(self.params.price_floor);
        // f64::max swallows NaN, so check the delta as well
        if !delta.is_finite() || !new_price.is_finite() {
            return Err(TickError::NonFinitePrice {
                agent_id: agent.id.clone(),
                tick,
            });
        }

        agent.price = new_price;
        agent.push_price(new_price);
        agent.market_cap = new_price * agent.total_backing;
        agent.volatility = rolling_volatility(agent.price_history());
        agent.inflow_velocity = (agent.inflow_velocity * self.params.inflow_decay).clamp(-1.0, 1.0);

        let passive_flow = self.passive_flow(agent, rng);
        if let Some(flow) = passive_flow {
            agent.apply_flow(flow);
        }

        Ok(PriceUpdate {
            old_price,
            new_price,
            delta,
            noise,
            passive_flow,
        })
    }

    /// Occasionally generates a small synthetic trade following the recent
    /// trend: a buy when the window is up, a half-sized sell otherwise.
    pub fn passive_flow<R: Rng + ?Sized>(&self, agent: &Agent, rng: &mut R) -> Option<Flow> {
        let p = &self.params;
        if !rng.gen_bool(p.passive_flow_prob.clamp(0.0, 1.0)) {
            return None;
        }
        let amount = if p.passive_flow_max > p.passive_flow_min {
            rng.gen_range(p.passive_flow_min..p.passive_flow_max)
        } else {
            p.passive_flow_min
        };
        if agent.price_change_pct() > 0.0 {
            Some(Flow::buy(amount))
        } else {
            Some(Flow::sell(amount * p.passive_sell_factor))
        }
    }
}

impl Default for PricingModel {
    fn default() -> Self {
        Self::new(PricingParams::default())
    }
}

// -----------------------------------------------------------------------------
//  Unit Tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sector, Side};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn quiet_params() -> PricingParams {
        PricingParams {
            noise_std: 0.0,
            passive_flow_prob: 0.0,
            ..PricingParams::default()
        }
    }

    fn make_agent(price: f64, inflow: f64) -> Agent {
        Agent::new(
            "probe",
            "Probe",
            Sector::FraudAml,
            Fundamentals::default(),
            inflow,
            1_000.0,
            price,
        )
    }

    #[test]
    fn inflow_pushes_price_and_then_decays() {
        let model = PricingModel::new(quiet_params());
        let mut agent = make_agent(100.0, 0.5);
        let baseline = agent.fundamentals;
        let mut rng = StdRng::seed_from_u64(1);

        let up = model.update_agent(&mut agent, &baseline, 0.0, 0, &mut rng).unwrap();
        assert!((up.delta - 0.075).abs() < 1e-12);
        assert!((agent.price - 107.5).abs() < 1e-9);
        assert!((agent.inflow_velocity - 0.475).abs() < 1e-12);
        assert!((agent.market_cap - 107_500.0).abs() < 1e-6);
        assert!(agent.volatility > 0.0);
    }

    #[test]
    fn fundamentals_deltas_enter_with_their_weights() {
        let model = PricingModel::new(quiet_params());
        let mut agent = make_agent(100.0, 0.0);
        let baseline = agent.fundamentals;
        agent.fundamentals.performance += 0.2;
        agent.fundamentals.risk += 0.1;
        // 0.10 * 0.2 - 0.12 * 0.1
        let d = model.delta(&agent, &baseline, 0.0, 0.0);
        assert!((d - 0.008).abs() < 1e-12);
    }

    #[test]
    fn price_never_drops_below_floor() {
        let model = PricingModel::new(quiet_params());
        let mut agent = make_agent(1.2, -1.0);
        let baseline = agent.fundamentals;
        let mut rng = StdRng::seed_from_u64(2);
        model.update_agent(&mut agent, &baseline, -0.9, 0, &mut rng).unwrap();
        assert_eq!(agent.price, 1.0);
    }

    #[test]
    fn non_finite_price_leaves_agent_untouched() {
        let model = PricingModel::new(quiet_params());
        let mut agent = make_agent(100.0, 0.0);
        let baseline = agent.fundamentals;
        let mut rng = StdRng::seed_from_u64(3);
        let err = model
            .update_agent(&mut agent, &baseline, f64::INFINITY, 7, &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            TickError::NonFinitePrice {
                agent_id: "probe".into(),
                tick: 7
            }
        );
        assert_eq!(agent.price, 100.0);
        assert_eq!(agent.price_history().len(), 20);
    }

    #[test]
    fn passive_flow_follows_trend() {
        let model = PricingModel::new(PricingParams {
            passive_flow_prob: 1.0,
            ..PricingParams::default()
        });
        let mut rng = StdRng::seed_from_u64(4);

        let mut rising = make_agent(100.0, 0.0);
        rising.price = 101.0;
        rising.push_price(101.0);
        let flow = model.passive_flow(&rising, &mut rng).unwrap();
        assert_eq!(flow.side, Side::Buy);
        assert!((10.0..80.0).contains(&flow.amount));

        let flat = make_agent(100.0, 0.0);
        let flow = model.passive_flow(&flat, &mut rng).unwrap();
        assert_eq!(flow.side, Side::Sell);
        assert!((5.0..40.0).contains(&flow.amount));
    }

    #[test]
    fn same_seed_same_path() {
        let model = PricingModel::default();
        let run = |seed: u64| {
            let mut agent = make_agent(50.0, 0.1);
            let baseline = agent.fundamentals;
            let mut rng = StdRng::seed_from_u64(seed);
            for tick in 0..30 {
                model.update_agent(&mut agent, &baseline, 0.0, tick, &mut rng).unwrap();
            }
            agent.price
        };
        assert_eq!(run(42), run(42));
    }

    proptest! {
        #[test]
        fn update_respects_bounds(
            price in 1.0f64..500.0,
            inflow in -1.0f64..=1.0,
            shock in -0.6f64..0.6,
            seed in any::<u64>(),
        ) {
            let model = PricingModel::new(PricingParams { passive_flow_prob: 1.0, ..PricingParams::default() });
            let mut agent = make_agent(price, inflow);
            let baseline = agent.fundamentals;
            let mut rng = StdRng::seed_from_u64(seed);
            for tick in 0..25 {
                model.update_agent(&mut agent, &baseline, shock, tick, &mut rng).unwrap();
                prop_assert!(agent.price >= 1.0);
                prop_assert!((-1.0..=1.0).contains(&agent.inflow_velocity));
                prop_assert!(agent.price_history().len() <= 20);
                prop_assert!(agent.volatility >= 0.0);
                prop_assert!(agent.total_backing >= 1.0);
            }
        }
    }
}
