// src/error.rs

use thiserror::Error;

/// Errors surfaced at the command boundary of the engine.
///
/// None of these ever reach the tick loop: invalid input is rejected (or
/// clamped) before it touches market state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown shock type: {0}")]
    UnknownShockType(String),
    #[error("unknown sector: {0}")]
    UnknownSector(String),
    #[error("severity must be a finite number, got {0}")]
    InvalidSeverity(f64),
    #[error("amount must be a positive finite number, got {0}")]
    InvalidAmount(f64),
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("failed to spawn tick thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// A single tick could not be computed. The tick is discarded and the
/// scheduler carries on with the next interval.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickError {
    #[error("non-finite price computed for agent {agent_id} on tick {tick}")]
    NonFinitePrice { agent_id: String, tick: u64 },
    #[error("market has no agents")]
    EmptyMarket,
    #[error("tick computation panicked: {0}")]
    Panicked(String),
    #[error("tick requested from inside a tick observer")]
    Reentrant,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tick interval is not a whole number of milliseconds: {0:?}")]
    InvalidInterval(String),
    #[error("tick interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read signal file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed signal file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// What a tick observer reports back. Failures are logged and otherwise ignored.
pub type ObserverResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
