// src/types/flow.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// A capital movement into (buy) or out of (sell) an agent's backing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    pub side: Side,
    pub amount: f64,
}

impl Flow {
    pub fn buy(amount: f64) -> Self {
        Self {
            side: Side::Buy,
            amount,
        }
    }

    pub fn sell(amount: f64) -> Self {
        Self {
            side: Side::Sell,
            amount,
        }
    }
}
