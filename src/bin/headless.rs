// src/bin/headless.rs
//! Runs the exchange without a UI and prints the final snapshot as JSON.
//!
//! Usage: headless [TICKS] [--replay [SIGNALS.json]] [--every N]
//!
//! `MARKET_TICK_INTERVAL_MS` and `DEMO_MODE` are honoured; `RUST_LOG`
//! controls log output (stderr). Ticks are driven back to back, the
//! interval only matters to the background scheduler.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use agent_exchange::{CascadeAlert, EngineConfig, HistoryMode, MarketEngine, load_signals};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Args {
    ticks: u64,
    replay: bool,
    signals_path: Option<PathBuf>,
    every: u64,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        ticks: 10,
        replay: false,
        signals_path: None,
        every: 3,
    };
    let mut it = std::env::args().skip(1).peekable();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--replay" => {
                args.replay = true;
                if let Some(next) = it.peek().filter(|n| !n.starts_with("--")) {
                    args.signals_path = Some(PathBuf::from(next));
                    it.next();
                }
            }
            "--every" => {
                let raw = it.next().ok_or("--every needs a value")?;
                args.every = raw
                    .parse::<u64>()
                    .map_err(|_| format!("bad --every value: {raw}"))?
                    .max(1);
            }
            other => {
                args.ticks = other
                    .parse()
                    .map_err(|_| format!("unrecognised argument: {other}"))?;
            }
        }
    }
    Ok(args)
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agent_exchange=info,info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();

    let args = parse_args()?;
    let config = EngineConfig::from_env()?;
    let engine = MarketEngine::new(config);
    engine.on_tick(Arc::new(CascadeAlert::new(engine.config().cascade_alert_threshold)));

    let mut signals = if args.replay {
        load_signals(args.signals_path.as_deref())?
    } else {
        Vec::new()
    }
    .into_iter();

    for tick in 0..args.ticks {
        if tick % args.every == 0 {
            if let Some(signal) = signals.next() {
                engine.ingest_signal(&signal);
            }
        }
        // a failed tick is logged by the engine; keep going like the scheduler would
        let _ = engine.tick_once();
    }

    let status = engine.status();
    info!(
        ticks = status.tick_number,
        failed = status.failed_ticks,
        active_shocks = status.active_shock_count,
        "run finished"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&engine.get_snapshot(HistoryMode::Strip))?
    );
    Ok(())
}
