// src/types/market.rs

use std::collections::BTreeMap;

use super::agent::{Agent, Sector};
use super::round_to;
use super::shock::Shock;
use super::snapshot::{HistoryMode, MarketSnapshot, SectorSummary};

/// The aggregate root. Exactly one lives inside a running engine.
///
/// Agents are keyed by id in a `BTreeMap` so every pass over them (and
/// therefore every draw from the engine's random source) happens in the
/// same order from run to run.
#[derive(Debug, Clone, Default)]
pub struct MarketState {
    pub agents: BTreeMap<String, Agent>,
    pub active_shocks: Vec<Shock>,
    pub tick_number: u64,
    pub total_market_cap: f64,
    pub cascade_probability: f64,
}

impl MarketState {
    pub fn new(agents: Vec<Agent>) -> Self {
        let agents: BTreeMap<String, Agent> =
            agents.into_iter().map(|a| (a.id.clone(), a)).collect();
        let total_market_cap = agents.values().map(|a| a.market_cap).sum();
        Self {
            agents,
            active_shocks: Vec::new(),
            tick_number: 0,
            total_market_cap,
            cascade_probability: 0.0,
        }
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agent_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn agents_in(&self, sector: Sector) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(move |a| a.sector == sector)
    }

    /// Mean raw price of a sector, or `None` when the sector is empty.
    pub fn sector_avg_price(&self, sector: Sector) -> Option<f64> {
        let (sum, count) = self
            .agents_in(sector)
            .fold((0.0, 0usize), |(sum, n), a| (sum + a.price, n + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn sector_summary(&self) -> Vec<SectorSummary> {
        Sector::ALL
            .into_iter()
            .filter_map(|sector| {
                let members: Vec<&Agent> = self.agents_in(sector).collect();
                if members.is_empty() {
                    return None;
                }
                let n = members.len() as f64;
                let avg_change = members.iter().map(|a| a.price_change_pct()).sum::<f64>() / n;
                let total_cap: f64 = members.iter().map(|a| a.market_cap).sum();
                Some(SectorSummary {
                    id: sector,
                    avg_price_change_pct: round_to(avg_change, 2),
                    total_market_cap: round_to(total_cap, 2),
                    agent_count: members.len(),
                })
            })
            .collect()
    }

    pub fn snapshot(&self, mode: HistoryMode, peak_market_cap: f64, drawdown_pct: f64) -> MarketSnapshot {
        MarketSnapshot {
            tick_number: self.tick_number,
            total_market_cap: round_to(self.total_market_cap, 2),
            cascade_probability: round_to(self.cascade_probability, 4),
            peak_market_cap: round_to(peak_market_cap, 2),
            drawdown_pct: round_to(drawdown_pct, 4),
            active_shocks: self.active_shocks.iter().map(|s| s.view()).collect(),
            agents: self.agents.values().map(|a| a.view(mode)).collect(),
            sectors: self.sector_summary(),
        }
    }
}
