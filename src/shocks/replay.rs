// src/shocks/replay.rs

//! Loads pre-captured signals from a JSON snapshot file so a demo can run
//! offline. A missing file is not an error: the built-in signals are used.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::signal::SignalEvent;
use crate::error::ReplayError;
use crate::types::unix_now;

/// One entry of a snapshot file. Only `source` and `type` are required.
#[derive(Debug, Deserialize)]
struct SignalRecord {
    id: Option<String>,
    source: String,
    #[serde(rename = "type")]
    signal_type: String,
    timestamp: Option<f64>,
    severity_hint: Option<f64>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

pub fn load_signals(path: Option<&Path>) -> Result<Vec<SignalEvent>, ReplayError> {
    let Some(path) = path.filter(|p| p.exists()) else {
        warn!(?path, "signal snapshot not found, using built-in demo signals");
        return Ok(builtin_demo_signals());
    };

    let shown = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: shown.clone(),
        source,
    })?;
    let records: Vec<SignalRecord> =
        serde_json::from_str(&raw).map_err(|source| ReplayError::Parse {
            path: shown.clone(),
            source,
        })?;

    let now = unix_now();
    let signals: Vec<SignalEvent> = records
        .into_iter()
        .enumerate()
        .map(|(i, r)| SignalEvent {
            id: r.id.unwrap_or_else(|| format!("replay_{i:02}")),
            source: r.source,
            signal_type: r.signal_type,
            timestamp: r.timestamp.unwrap_or(now),
            severity_hint: r.severity_hint.unwrap_or(0.5),
            metadata: r.metadata,
        })
        .collect();
    info!(count = signals.len(), path = %shown, "loaded signals");
    Ok(signals)
}

fn meta(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Hardcoded signals producing a predictable sequence of shocks.
pub fn builtin_demo_signals() -> Vec<SignalEvent> {
    let now = unix_now();
    let signal = |id: &str, source: &str, kind: &str, ago: f64, hint: f64, metadata: Value| SignalEvent {
        id: id.into(),
        source: source.into(),
        signal_type: kind.into(),
        timestamp: now - ago,
        severity_hint: hint,
        metadata: meta(metadata),
    };

    vec![
        signal(
            "demo_01",
            "GDELT",
            "NEWS",
            600.0,
            0.72,
            json!({
                "title": "EU AI Act enforcement begins, fines for non-compliance announced",
                "themes": ["REGULATION", "AI_GOVERNANCE"],
                "tone": -7.2
            }),
        ),
        signal(
            "demo_02",
            "USGS",
            "EARTHQUAKE",
            300.0,
            0.55,
            json!({"magnitude": 5.5, "location": "Near Singapore Strait", "lat": 1.29, "lon": 103.85}),
        ),
        signal(
            "demo_03",
            "FX",
            "FX_MOVE",
            120.0,
            0.40,
            json!({"pair": "USD/EUR", "delta_pct": -0.82, "rate": 0.918}),
        ),
        signal(
            "demo_04",
            "GDELT",
            "NEWS",
            60.0,
            0.65,
            json!({
                "title": "OFAC announces new sanctions package targeting fintech operators",
                "themes": ["SANCTIONS", "FINTECH"],
                "tone": -5.8
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shocks::convert_signal;
    use crate::types::ShockType;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_builtins() {
        let signals = load_signals(Some(Path::new("/definitely/not/here.json"))).unwrap();
        assert_eq!(signals.len(), 4);
        let signals = load_signals(None).unwrap();
        assert_eq!(signals[0].id, "demo_01");
    }

    #[test]
    fn builtin_signals_map_to_expected_shocks() {
        let kinds: Vec<ShockType> = builtin_demo_signals()
            .iter()
            .filter_map(convert_signal)
            .map(|r| r.shock_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ShockType::Regulation,
                ShockType::Earthquake,
                ShockType::FxShock,
                ShockType::Sanctions
            ]
        );
    }

    #[test]
    fn file_records_get_defaults() {
        let path = std::env::temp_dir().join(format!("aex_replay_{}.json", std::process::id()));
        let mut f = fs::File::create(&path).unwrap();
        write!(f, r#"[{{"source":"FX","type":"FX_MOVE","metadata":{{"pair":"GBP/USD"}}}}]"#).unwrap();
        drop(f);

        let signals = load_signals(Some(&path)).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].id, "replay_00");
        assert_eq!(signals[0].severity_hint, 0.5);
        assert_eq!(signals[0].metadata["pair"], "GBP/USD");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("aex_replay_bad_{}.json", std::process::id()));
        fs::write(&path, "{not json").unwrap();
        let err = load_signals(Some(&path)).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ReplayError::Parse { .. }));
    }
}
