// src/types/agent.rs
//! The tradable entities of the exchange.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::flow::{Flow, Side};
use super::round_to;
use super::snapshot::HistoryMode;
use crate::config::{HISTORY_WINDOW, MIN_BACKING};
use crate::error::EngineError;

/// Inflow velocity beyond which an agent is considered to be trending.
pub const INFLOW_TREND_THRESHOLD: f64 = 0.05;

/// Agent categories. Sectors share shock sensitivities through the beta matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sector {
    FraudAml,
    Compliance,
    GeoOsint,
}

impl Sector {
    pub const ALL: [Sector; 3] = [Sector::FraudAml, Sector::Compliance, Sector::GeoOsint];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::FraudAml => "FRAUD_AML",
            Sector::Compliance => "COMPLIANCE",
            Sector::GeoOsint => "GEO_OSINT",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Sector::ALL
            .into_iter()
            .find(|sector| sector.as_str() == wanted)
            .ok_or_else(|| EngineError::UnknownSector(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InflowDirection {
    Up,
    Down,
    Flat,
}

/// Slow-moving scores, all in [0, 1]. The engine never changes these itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub usage: f64,
    pub performance: f64,
    pub reliability: f64,
    pub risk: f64,
}

impl Default for Fundamentals {
    fn default() -> Self {
        Self {
            usage: 0.5,
            performance: 0.5,
            reliability: 0.5,
            risk: 0.5,
        }
    }
}

/// A partial overwrite of an agent's fundamentals, issued by an external
/// collaborator between ticks. Missing fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsUpdate {
    pub usage: Option<f64>,
    pub performance: Option<f64>,
    pub reliability: Option<f64>,
    pub risk: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub sector: Sector,
    pub fundamentals: Fundamentals,
    /// Normalized recent net capital flow, always in [-1, 1].
    pub inflow_velocity: f64,
    /// Capital allocated to the agent, never below 1.0.
    pub total_backing: f64,
    pub price: f64,
    pub volatility: f64,
    pub market_cap: f64,
    price_history: VecDeque<f64>,
    history_window: usize,
}

impl Agent {
    #[inline]
    pub fn new<T1: Into<String>, T2: Into<String>>(
        id: T1,
        name: T2,
        sector: Sector,
        fundamentals: Fundamentals,
        inflow_velocity: f64,
        total_backing: f64,
        price: f64,
    ) -> Self {
        Self::with_history_window(
            id,
            name,
            sector,
            fundamentals,
            inflow_velocity,
            total_backing,
            price,
            HISTORY_WINDOW,
        )
    }

    /// Builds an agent whose rolling window holds `history_window` prices.
    /// The window starts full of the initial price so volatility and percent
    /// change are defined from the very first tick.
    #[allow(clippy::too_many_arguments)]
    pub fn with_history_window<T1: Into<String>, T2: Into<String>>(
        id: T1,
        name: T2,
        sector: Sector,
        fundamentals: Fundamentals,
        inflow_velocity: f64,
        total_backing: f64,
        price: f64,
        history_window: usize,
    ) -> Self {
        let history_window = history_window.max(2);
        let total_backing = total_backing.max(MIN_BACKING);
        Self {
            id: id.into(),
            name: name.into(),
            sector,
            fundamentals,
            inflow_velocity: inflow_velocity.clamp(-1.0, 1.0),
            total_backing,
            price,
            volatility: 0.0,
            market_cap: price * total_backing,
            price_history: std::iter::repeat(price).take(history_window).collect(),
            history_window,
        }
    }

    pub fn price_history(&self) -> &VecDeque<f64> {
        &self.price_history
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Resizes the rolling window. Shrinking evicts the oldest prices.
    pub fn set_history_window(&mut self, history_window: usize) {
        self.history_window = history_window.max(2);
        while self.price_history.len() > self.history_window {
            self.price_history.pop_front();
        }
    }

    /// Appends a price to the rolling window, evicting the oldest entries beyond capacity.
    pub fn push_price(&mut self, price: f64) {
        self.price_history.push_back(price);
        while self.price_history.len() > self.history_window {
            self.price_history.pop_front();
        }
    }

    /// Percentage change of the current price against the oldest price in the window.
    pub fn price_change_pct(&self) -> f64 {
        if self.price_history.len() < 2 {
            return 0.0;
        }
        match self.price_history.front() {
            Some(&oldest) if oldest != 0.0 => (self.price - oldest) / oldest * 100.0,
            _ => 0.0,
        }
    }

    pub fn inflow_direction(&self) -> InflowDirection {
        if self.inflow_velocity > INFLOW_TREND_THRESHOLD {
            InflowDirection::Up
        } else if self.inflow_velocity < -INFLOW_TREND_THRESHOLD {
            InflowDirection::Down
        } else {
            InflowDirection::Flat
        }
    }

    /// Moves capital in or out. Velocity is nudged by the amount relative to
    /// current backing; backing never drops below 1.0.
    pub fn apply_flow(&mut self, flow: Flow) {
        let delta = flow.amount / self.total_backing.max(MIN_BACKING);
        match flow.side {
            Side::Buy => {
                self.inflow_velocity = (self.inflow_velocity + delta).clamp(-1.0, 1.0);
                self.total_backing += flow.amount;
            }
            Side::Sell => {
                self.inflow_velocity = (self.inflow_velocity - delta).clamp(-1.0, 1.0);
                self.total_backing = (self.total_backing - flow.amount).max(MIN_BACKING);
            }
        }
    }

    pub fn apply_fundamentals(&mut self, update: &FundamentalsUpdate) {
        let set = |slot: &mut f64, value: Option<f64>| {
            if let Some(v) = value.filter(|v| v.is_finite()) {
                *slot = v.clamp(0.0, 1.0);
            }
        };
        set(&mut self.fundamentals.usage, update.usage);
        set(&mut self.fundamentals.performance, update.performance);
        set(&mut self.fundamentals.reliability, update.reliability);
        set(&mut self.fundamentals.risk, update.risk);
    }

    pub fn view(&self, mode: HistoryMode) -> AgentView {
        AgentView {
            id: self.id.clone(),
            name: self.name.clone(),
            sector: self.sector,
            price: round_to(self.price, 2),
            price_change_pct: round_to(self.price_change_pct(), 2),
            market_cap: round_to(self.market_cap, 2),
            usage_score: self.fundamentals.usage,
            performance_score: self.fundamentals.performance,
            reliability_score: self.fundamentals.reliability,
            risk_score: self.fundamentals.risk,
            inflow_velocity: round_to(self.inflow_velocity, 4),
            inflow_direction: self.inflow_direction(),
            volatility: round_to(self.volatility, 4),
            total_backing: round_to(self.total_backing, 2),
            price_history: match mode {
                HistoryMode::Include => Some(self.price_history.iter().copied().collect()),
                HistoryMode::Strip => None,
            },
        }
    }
}

/// Wire shape of an agent as handed to external callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub sector: Sector,
    pub price: f64,
    pub price_change_pct: f64,
    pub market_cap: f64,
    pub usage_score: f64,
    pub performance_score: f64,
    pub reliability_score: f64,
    pub risk_score: f64,
    pub inflow_velocity: f64,
    pub inflow_direction: InflowDirection,
    pub volatility: f64,
    pub total_backing: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_history: Option<Vec<f64>>,
}

// -----------------------------------------------------------------------------
//  Unit tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn make_agent(price: f64, backing: f64) -> Agent {
        Agent::new(
            "probe",
            "Probe",
            Sector::Compliance,
            Fundamentals::default(),
            0.0,
            backing,
            price,
        )
    }

    #[test]
    fn history_starts_full_of_initial_price() {
        let agent = make_agent(142.5, 5_000.0);
        assert_eq!(agent.price_history().len(), HISTORY_WINDOW);
        assert!(agent.price_history().iter().all(|&p| p == 142.5));
        assert_eq!(agent.price_change_pct(), 0.0);
        assert_eq!(agent.market_cap, 142.5 * 5_000.0);
    }

    #[test]
    fn push_price_evicts_oldest_first() {
        let mut agent = make_agent(10.0, 100.0);
        for i in 0..25 {
            agent.push_price(100.0 + i as f64);
        }
        assert_eq!(agent.price_history().len(), HISTORY_WINDOW);
        assert_eq!(agent.price_history().front(), Some(&105.0));
        assert_eq!(agent.price_history().back(), Some(&124.0));
    }

    #[test]
    fn price_change_is_relative_to_oldest() {
        let mut agent = make_agent(100.0, 100.0);
        agent.price = 110.0;
        agent.push_price(110.0);
        assert!((agent.price_change_pct() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn inflow_direction_thresholds() {
        let mut agent = make_agent(10.0, 100.0);
        agent.inflow_velocity = 0.05;
        assert_eq!(agent.inflow_direction(), InflowDirection::Flat);
        agent.inflow_velocity = 0.051;
        assert_eq!(agent.inflow_direction(), InflowDirection::Up);
        agent.inflow_velocity = -0.06;
        assert_eq!(agent.inflow_direction(), InflowDirection::Down);
    }

    #[test]
    fn flows_clamp_velocity_and_floor_backing() {
        let mut agent = make_agent(10.0, 100.0);
        agent.apply_flow(Flow::buy(1_000.0));
        assert_eq!(agent.inflow_velocity, 1.0);
        assert_eq!(agent.total_backing, 1_100.0);

        agent.apply_flow(Flow::sell(50_000.0));
        assert_eq!(agent.inflow_velocity, -1.0);
        assert_eq!(agent.total_backing, MIN_BACKING);
    }

    #[test]
    fn fundamentals_update_clamps_and_skips_missing() {
        let mut agent = make_agent(10.0, 100.0);
        agent.apply_fundamentals(&FundamentalsUpdate {
            performance: Some(1.7),
            risk: Some(f64::NAN),
            ..Default::default()
        });
        assert_eq!(agent.fundamentals.performance, 1.0);
        assert_eq!(agent.fundamentals.risk, 0.5);
        assert_eq!(agent.fundamentals.usage, 0.5);
    }

    #[test]
    fn view_strips_history_on_request() {
        let agent = make_agent(10.123, 100.0);
        assert!(agent.view(HistoryMode::Strip).price_history.is_none());
        let full = agent.view(HistoryMode::Include);
        assert_eq!(full.price_history.map(|h| h.len()), Some(HISTORY_WINDOW));
        assert_eq!(full.price, 10.12);
    }

    #[test]
    fn sector_parses_wire_names() {
        assert_eq!("geo_osint".parse::<Sector>().unwrap(), Sector::GeoOsint);
        assert!("RETAIL".parse::<Sector>().is_err());
        assert_eq!(
            serde_json::to_string(&Sector::FraudAml).unwrap(),
            "\"FRAUD_AML\""
        );
    }
}
