// src/shocks/mod.rs

// Beta table, the active-shock book, and the conversion of raw external
// signals into shock requests.
pub mod betas;
pub mod propagation;
pub mod replay;
pub mod signal;

pub use betas::{BetaMatrix, DECAY_SCHEDULE, MAX_TICK_IMPACT};
pub use propagation::{SeverityPolicy, aggregate_impacts, build_shock, decay_shocks};
pub use replay::{builtin_demo_signals, load_signals};
pub use signal::{SignalEvent, convert_signal};
