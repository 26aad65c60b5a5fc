// src/shocks/signal.rs

//! Turns normalized external signals (news, seismic, FX feeds) into shock
//! requests the engine can inject.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{ShockRequest, ShockType};

/// Signals weaker than this never become shocks.
pub const MIN_SIGNAL_SEVERITY: f64 = 0.15;

/// A normalized observation from an external feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub id: String,
    /// Feed name, e.g. `GDELT`, `USGS`, `FX`.
    pub source: String,
    /// Feed-specific kind, e.g. `NEWS`, `EARTHQUAKE`, `FX_MOVE`.
    pub signal_type: String,
    pub timestamp: f64,
    pub severity_hint: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

// Signal type -> shock type.
const DIRECT_MAP: [(&str, ShockType); 6] = [
    ("REGULATION", ShockType::Regulation),
    ("SANCTIONS", ShockType::Sanctions),
    ("CYBER", ShockType::Cyber),
    ("HACK", ShockType::Cyber),
    ("EARTHQUAKE", ShockType::Earthquake),
    ("FX_MOVE", ShockType::FxShock),
];

// News theme keyword -> shock type, scanned in order.
const THEME_MAP: [(&str, ShockType); 6] = [
    ("TAX", ShockType::Regulation),
    ("REGULATION", ShockType::Regulation),
    ("SANCTION", ShockType::Sanctions),
    ("CYBER", ShockType::Cyber),
    ("HACK", ShockType::Cyber),
    ("ECON", ShockType::FxShock),
];

/// Converts a signal into a shock request, or `None` if the signal is too
/// weak or cannot be mapped onto a shock type.
pub fn convert_signal(signal: &SignalEvent) -> Option<ShockRequest> {
    if !(signal.severity_hint >= MIN_SIGNAL_SEVERITY) {
        debug!(signal = %signal.id, hint = signal.severity_hint, "signal below severity threshold");
        return None;
    }

    let Some(shock_type) = resolve_shock_type(signal) else {
        debug!(signal = %signal.id, source = %signal.source, "no shock type for signal");
        return None;
    };

    Some(
        ShockRequest::new(shock_type)
            .with_severity(signal.severity_hint.min(1.0))
            .with_description(describe(signal))
            .with_source(signal.source.clone())
            .with_timestamp(signal.timestamp),
    )
}

fn resolve_shock_type(signal: &SignalEvent) -> Option<ShockType> {
    let kind = signal.signal_type.to_ascii_uppercase();
    if let Some((_, t)) = DIRECT_MAP.iter().find(|(k, _)| *k == kind) {
        return Some(*t);
    }

    let themes = signal
        .metadata
        .get("themes")
        .and_then(Value::as_array)
        .map(|v| v.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    for theme in themes {
        let theme = theme.to_ascii_uppercase();
        if let Some((_, t)) = THEME_MAP.iter().find(|(k, _)| theme.contains(k)) {
            return Some(*t);
        }
    }

    match signal.source.as_str() {
        "FX" => Some(ShockType::FxShock),
        "USGS" => Some(ShockType::Earthquake),
        _ => None,
    }
}

fn meta_text(meta: &Map<String, Value>, key: &str) -> Option<String> {
    match meta.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn describe(signal: &SignalEvent) -> String {
    let meta = &signal.metadata;
    match signal.source.as_str() {
        "GDELT" => meta_text(meta, "title").unwrap_or_else(|| "News event detected".into()),
        "USGS" => {
            let mag = meta_text(meta, "magnitude").unwrap_or_else(|| "?".into());
            let loc = meta_text(meta, "location").unwrap_or_else(|| "unknown region".into());
            format!("M{mag} earthquake near {loc}")
        }
        "FX" => {
            let pair = meta_text(meta, "pair").unwrap_or_else(|| "USD/EUR".into());
            let delta = meta.get("delta_pct").and_then(Value::as_f64).unwrap_or(0.0);
            format!("FX spike: {pair} moved {delta:+.2}%")
        }
        _ => "External signal event".into(),
    }
}
