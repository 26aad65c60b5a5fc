// src/types/snapshot.rs

use serde::{Deserialize, Serialize};

use super::agent::{AgentView, Sector};
use super::shock::ShockView;

/// Whether per-agent price history is copied into a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    Include,
    #[default]
    Strip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSummary {
    pub id: Sector,
    pub avg_price_change_pct: f64,
    pub total_market_cap: f64,
    pub agent_count: usize,
}

/// Immutable, owned, point-in-time view of the market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub tick_number: u64,
    pub total_market_cap: f64,
    pub cascade_probability: f64,
    pub peak_market_cap: f64,
    pub drawdown_pct: f64,
    pub active_shocks: Vec<ShockView>,
    pub agents: Vec<AgentView>,
    pub sectors: Vec<SectorSummary>,
}

impl MarketSnapshot {
    pub fn agent(&self, id: &str) -> Option<&AgentView> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn sector(&self, sector: Sector) -> Option<&SectorSummary> {
        self.sectors.iter().find(|s| s.id == sector)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
