// src/universe/mod.rs
// -------------------
pub mod seed;

pub use seed::{SEED_AGENT_COUNT, default_agent_universe};
