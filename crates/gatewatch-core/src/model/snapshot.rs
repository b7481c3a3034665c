// ── Publication types ──
//
// What the host platform receives: a state value plus an attribute map
// per entity, and discrete named events.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::frame::Payload;

/// Name of the event fired once per decoded action pulse.
pub const CLICK_EVENT: &str = "xiaomi_aqara.click";

/// Point-in-time state of one entity as published to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub entity_id: String,
    /// `None` is the explicit "no value" marker.
    pub state: Option<Value>,
    pub attributes: Payload,
}

impl StateSnapshot {
    pub fn new(entity_id: impl Into<String>, state: Option<Value>, attributes: Payload) -> Self {
        Self {
            entity_id: entity_id.into(),
            state,
            attributes,
        }
    }

    /// State rendered for display; `None` becomes `unknown`.
    pub fn state_text(&self) -> String {
        match &self.state {
            None | Some(Value::Null) => "unknown".into(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Discrete notification fired to the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// A decoded action pulse (button press, vibration, tilt).
    Click { entity_id: String, click_type: String },
}

impl PlatformEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Click { .. } => CLICK_EVENT,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Self::Click { entity_id, .. } => entity_id,
        }
    }
}

/// ISO-8601 timestamp at second precision, the format every stats entity
/// publishes.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}
