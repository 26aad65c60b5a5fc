// src/pricing/mod.rs

// Per-agent price update, rolling volatility and the market-wide cascade
// risk signal.
pub mod cascade;
pub mod model;
pub mod volatility;

pub use cascade::{cascade_from_parts, cascade_probability};
pub use model::{PriceUpdate, PricingModel};
pub use volatility::{log_returns, rolling_volatility};
