// src/types/shock.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Number of ticks a shock stays active.
pub const SHOCK_LIFETIME_TICKS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShockType {
    Regulation,
    Cyber,
    FxShock,
    Earthquake,
    Sanctions,
}

impl ShockType {
    pub const ALL: [ShockType; 5] = [
        ShockType::Regulation,
        ShockType::Cyber,
        ShockType::FxShock,
        ShockType::Earthquake,
        ShockType::Sanctions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShockType::Regulation => "REGULATION",
            ShockType::Cyber => "CYBER",
            ShockType::FxShock => "FX_SHOCK",
            ShockType::Earthquake => "EARTHQUAKE",
            ShockType::Sanctions => "SANCTIONS",
        }
    }

    /// Severity used in deterministic mode when an injection leaves it unspecified.
    pub fn demo_severity(&self) -> f64 {
        match self {
            ShockType::Regulation => 0.70,
            ShockType::Cyber => 0.60,
            ShockType::FxShock => 0.50,
            ShockType::Earthquake => 0.55,
            ShockType::Sanctions => 0.65,
        }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            ShockType::Regulation => "Regulatory crackdown on AI systems announced",
            ShockType::Cyber => "Large-scale cyber attack detected across financial networks",
            ShockType::FxShock => "Significant FX volatility spike in major currency pair",
            ShockType::Earthquake => "Major earthquake near financial infrastructure hub",
            ShockType::Sanctions => "New sanctions package targeting tech sector announced",
        }
    }
}

impl fmt::Display for ShockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShockType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        ShockType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| EngineError::UnknownShockType(s.to_string()))
    }
}

/// A time-limited market-wide event. Only `ticks_remaining` changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Shock {
    pub id: String,
    pub shock_type: ShockType,
    pub severity: f64,
    pub description: String,
    pub source: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub ticks_remaining: u32,
}

impl Shock {
    pub fn is_expired(&self) -> bool {
        self.ticks_remaining == 0
    }

    pub fn view(&self) -> ShockView {
        ShockView {
            id: self.id.clone(),
            shock_type: self.shock_type,
            severity: self.severity,
            description: self.description.clone(),
            timestamp: self.timestamp,
            ticks_remaining: self.ticks_remaining,
            source: self.source.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockView {
    pub id: String,
    #[serde(rename = "type")]
    pub shock_type: ShockType,
    pub severity: f64,
    pub description: String,
    pub timestamp: f64,
    pub ticks_remaining: u32,
    pub source: String,
}

fn manual_source() -> String {
    "manual".to_string()
}

/// Input of the shock injection command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockRequest {
    pub shock_type: ShockType,
    #[serde(default)]
    pub severity: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "manual_source")]
    pub source: String,
    /// When the underlying event happened. Injection time if absent.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl ShockRequest {
    pub fn new(shock_type: ShockType) -> Self {
        Self {
            shock_type,
            severity: None,
            description: None,
            source: manual_source(),
            timestamp: None,
        }
    }

    pub fn with_severity(mut self, severity: f64) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source<T: Into<String>>(mut self, source: T) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
