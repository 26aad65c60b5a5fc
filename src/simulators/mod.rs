// src/simulators/mod.rs

pub mod market_trait;
pub mod simulation;

pub use market_trait::Marketable;
pub use simulation::{Simulation, TickOutcome};
