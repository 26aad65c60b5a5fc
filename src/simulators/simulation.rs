// src/simulators/simulation.rs

//! The exchange itself: market state plus everything needed to advance it.
//!
//! One tick runs, in order:
//!
//! ```text
//! 1. shock impact per agent      (pre-decrement ticks_remaining)
//! 2. shock decay / expiry
//! 3. per-agent pricing update    (noise + passive flow from the one rng)
//! 4. aggregates                  (total cap, cascade, tick_number, peak/drawdown)
//! 5. fundamentals baseline capture for the next tick
//! ```
//!
//! The tick works on a copy of the state and random source and only commits
//! them if every step succeeded, so readers never see a half-applied tick.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, TickError};
use crate::pricing::{PricingModel, cascade_probability};
use crate::shocks::{BetaMatrix, SeverityPolicy, aggregate_impacts, build_shock, decay_shocks};
use crate::types::{
    Agent, AgentView, Flow, Fundamentals, FundamentalsUpdate, HistoryMode, MarketSnapshot,
    MarketState, ShockRequest, ShockView, unix_now,
};
use crate::universe::default_agent_universe;

use super::market_trait::Marketable;

// Mixed into the engine seed for the shock id stream.
const SHOCK_ID_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Summary of a committed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick_number: u64,
    pub total_market_cap: f64,
    pub cascade_probability: f64,
    pub expired_shocks: usize,
    pub passive_flows: usize,
}

pub struct Simulation {
    state: MarketState,
    baseline: BTreeMap<String, Fundamentals>,
    peak_market_cap: f64,
    drawdown_pct: f64,
    rng: StdRng,
    // Separate stream so injecting a shock never shifts noise or passive flows.
    id_rng: StdRng,
    pricing: PricingModel,
    betas: BetaMatrix,
    severity: SeverityPolicy,
    seed: Option<u64>,
    // Kept for resetting.
    initial_agents: Vec<Agent>,
}

impl Simulation {
    /// Builds the exchange from the default eight-agent universe.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_agents(config, default_agent_universe())
    }

    pub fn with_agents(config: &EngineConfig, mut agents: Vec<Agent>) -> Self {
        for agent in &mut agents {
            agent.set_history_window(config.pricing.history_window);
        }
        let seed = config.deterministic.then_some(config.seed);
        let state = MarketState::new(agents.clone());
        let mut sim = Self {
            peak_market_cap: state.total_market_cap,
            drawdown_pct: 0.0,
            baseline: BTreeMap::new(),
            state,
            rng: Self::make_rng(seed),
            id_rng: Self::make_rng(seed.map(|s| s ^ SHOCK_ID_STREAM)),
            pricing: PricingModel::new(config.pricing),
            betas: config.betas.clone(),
            severity: SeverityPolicy {
                deterministic: config.deterministic,
                fallback: config.default_severity,
            },
            seed,
            initial_agents: agents,
        };
        sim.capture_baseline();
        sim
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn peak_market_cap(&self) -> f64 {
        self.peak_market_cap
    }

    /// Percent distance of the current total cap from its running peak (≤ 0).
    pub fn drawdown_pct(&self) -> f64 {
        self.drawdown_pct
    }

    pub fn betas(&self) -> &BetaMatrix {
        &self.betas
    }

    pub fn snapshot(&self, mode: HistoryMode) -> MarketSnapshot {
        self.state
            .snapshot(mode, self.peak_market_cap, self.drawdown_pct)
    }

    pub fn agent_views(&self, mode: HistoryMode) -> Vec<AgentView> {
        self.state.agents.values().map(|a| a.view(mode)).collect()
    }

    pub fn inject_shock(&mut self, request: ShockRequest) -> Result<ShockView, EngineError> {
        let severity = self.severity.resolve(request.shock_type, request.severity)?;
        let id = self.next_shock_id();
        let timestamp = request
            .timestamp
            .filter(|t| t.is_finite())
            .unwrap_or_else(unix_now);
        let shock = build_shock(request, severity, id, timestamp);
        info!(
            shock_id = %shock.id,
            shock_type = %shock.shock_type,
            severity = shock.severity,
            source = %shock.source,
            "shock injected"
        );
        let view = shock.view();
        self.state.active_shocks.push(shock);
        Ok(view)
    }

    // Seeded alongside the engine rng so a deterministic run reproduces ids too.
    fn next_shock_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.id_rng.fill(&mut bytes);
        let id = uuid::Builder::from_random_bytes(bytes).into_uuid();
        id.simple().to_string()[..8].to_string()
    }

    /// Applies a buy or sell. Returns `false` (and changes nothing) for an unknown id.
    pub fn apply_flow(&mut self, agent_id: &str, flow: Flow) -> bool {
        match self.state.agent_mut(agent_id) {
            Some(agent) => {
                agent.apply_flow(flow);
                true
            }
            None => false,
        }
    }

    /// Overwrites fundamentals between ticks. The next tick prices the
    /// difference against the baseline captured at the end of the last one.
    pub fn update_fundamentals(&mut self, agent_id: &str, update: &FundamentalsUpdate) -> bool {
        match self.state.agent_mut(agent_id) {
            Some(agent) => {
                agent.apply_fundamentals(update);
                true
            }
            None => false,
        }
    }

    fn capture_baseline(&mut self) {
        self.baseline = self
            .state
            .agents
            .iter()
            .map(|(id, a)| (id.clone(), a.fundamentals))
            .collect();
    }

    fn run_tick(&mut self) -> Result<TickOutcome, TickError> {
        if self.state.agents.is_empty() {
            return Err(TickError::EmptyMarket);
        }

        let mut next = self.state.clone();
        let mut rng = self.rng.clone();
        let tick = next.tick_number + 1;

        let impacts = aggregate_impacts(&next.active_shocks, next.agents.values(), &self.betas);
        let expired_shocks = decay_shocks(&mut next.active_shocks);

        let mut passive_flows = 0;
        for agent in next.agents.values_mut() {
            let baseline = self
                .baseline
                .get(&agent.id)
                .copied()
                .unwrap_or(agent.fundamentals);
            let impact = impacts.get(&agent.id).copied().unwrap_or(0.0);
            let update = self
                .pricing
                .update_agent(agent, &baseline, impact, tick, &mut rng)?;
            if update.passive_flow.is_some() {
                passive_flows += 1;
            }
        }

        next.total_market_cap = next.agents.values().map(|a| a.market_cap).sum();
        next.cascade_probability = cascade_probability(next.agents.values(), &next.active_shocks);
        next.tick_number = tick;

        // commit
        self.state = next;
        self.rng = rng;
        if self.state.total_market_cap > self.peak_market_cap {
            self.peak_market_cap = self.state.total_market_cap;
        }
        if self.peak_market_cap > 0.0 {
            self.drawdown_pct =
                (self.state.total_market_cap - self.peak_market_cap) / self.peak_market_cap * 100.0;
        }
        self.capture_baseline();

        if expired_shocks > 0 {
            debug!(tick, expired_shocks, "shocks expired");
        }
        Ok(TickOutcome {
            tick_number: tick,
            total_market_cap: self.state.total_market_cap,
            cascade_probability: self.state.cascade_probability,
            expired_shocks,
            passive_flows,
        })
    }
}

impl Marketable for Simulation {
    fn step(&mut self) -> Result<TickOutcome, TickError> {
        self.run_tick()
    }

    fn tick_number(&self) -> u64 {
        self.state.tick_number
    }

    /// Rebuilds the seed agents, clears shocks and reseeds the rng, as a
    /// process restart would.
    fn reset(&mut self) {
        self.state = MarketState::new(self.initial_agents.clone());
        self.rng = Self::make_rng(self.seed);
        self.id_rng = Self::make_rng(self.seed.map(|s| s ^ SHOCK_ID_STREAM));
        self.peak_market_cap = self.state.total_market_cap;
        self.drawdown_pct = 0.0;
        self.capture_baseline();
    }
}
