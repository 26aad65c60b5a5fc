// src/simulators/market_trait.rs

use crate::error::TickError;

use super::simulation::TickOutcome;

/// A trait for any object that can advance the exchange one tick at a time.
/// This allows the scheduler to drive a pluggable simulation core.
pub trait Marketable {
    /// Advances the simulation by one tick. On error nothing is committed.
    fn step(&mut self) -> Result<TickOutcome, TickError>;

    /// Number of ticks completed so far.
    fn tick_number(&self) -> u64;

    /// Resets the simulation to its seed state.
    fn reset(&mut self);
}
