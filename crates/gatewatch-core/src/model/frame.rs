// ── Gateway frames ──
//
// The transport hands every callback a loosely typed JSON object. Zigbee
// statistics frames are classified here into a tagged union by checking
// which discriminating field is present, in a fixed order; the remaining
// categories (actions, BLE) are interpreted by their entities directly.

use std::time::Duration;

use chrono::TimeDelta;
use serde_json::Value;

use crate::error::FrameError;

/// A decoded message delivered by the gateway for one device.
///
/// Insertion order is preserved (`serde_json/preserve_order`), so consumers
/// can observe the order in which the gateway emitted the fields.
pub type Payload = serde_json::Map<String, Value>;

/// ZCL `deviceState` value the gateway reports for an unresponsive device.
pub const DEVICE_STATE_UNRESPONSIVE: i64 = 17;

/// Manufacturer-specific flag in the ZCL frame-control byte. When set, a
/// two-byte manufacturer code precedes the transaction sequence number.
const ZCL_MANUFACTURER_SPECIFIC: u8 = 0x04;

// ── Frame categories ────────────────────────────────────────────────

/// One Zigbee statistics frame, classified by its discriminating field.
#[derive(Debug, Clone, PartialEq)]
pub enum ZigbeeFrame {
    /// A received message with radio metrics and sequence counters.
    Telemetry(Telemetry),
    /// Routing table report: parent router and time since last contact.
    RoutingInfo { ago: TimeDelta, fields: Payload },
    /// Device-state change notification.
    DeviceState { code: i64 },
    /// Empty notification tick carrying no data.
    Heartbeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub source_address: String,
    pub link_quality: i64,
    pub rssi: i64,
    pub cluster_id: u16,
    /// The counter pair is parsed independently: a broken pair only
    /// discards the loss observation, not the whole frame.
    pub counters: Result<CounterPair, FrameError>,
}

/// APS-layer counter and ZCL transaction sequence number of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterPair {
    pub aps: u8,
    pub zcl: u8,
}

impl ZigbeeFrame {
    /// Classify a raw payload. The first satisfied predicate wins:
    /// `sourceAddress` → telemetry, `parent` → routing info,
    /// `deviceState` → state change, empty → heartbeat.
    pub fn parse(payload: &Payload) -> Result<Self, FrameError> {
        if payload.contains_key("sourceAddress") {
            return Telemetry::parse(payload).map(Self::Telemetry);
        }

        if payload.contains_key("parent") {
            let ago = required(payload, "ago")?
                .as_f64()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .and_then(|ago| TimeDelta::from_std(ago).ok())
                .ok_or(FrameError::WrongType {
                    field: "ago",
                    expected: "non-negative seconds",
                })?;
            let mut fields = payload.clone();
            fields.remove("ago");
            return Ok(Self::RoutingInfo { ago, fields });
        }

        if let Some(state) = payload.get("deviceState") {
            let code = int_value("deviceState", state)?;
            return Ok(Self::DeviceState { code });
        }

        if payload.is_empty() {
            return Ok(Self::Heartbeat);
        }

        Err(FrameError::Unrecognized)
    }
}

impl Telemetry {
    fn parse(payload: &Payload) -> Result<Self, FrameError> {
        let source_address = match required(payload, "sourceAddress")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(FrameError::WrongType {
                    field: "sourceAddress",
                    expected: "string or number",
                });
            }
        };
        let link_quality = int_value("linkQuality", required(payload, "linkQuality")?)?;
        let rssi = int_value("rssi", required(payload, "rssi")?)?;

        let raw_cluster = int_value("clusterId", required(payload, "clusterId")?)?;
        let cluster_id = u16::try_from(raw_cluster).map_err(|_| FrameError::BadInteger {
            field: "clusterId",
            value: raw_cluster.to_string(),
        })?;

        Ok(Self {
            source_address,
            link_quality,
            rssi,
            cluster_id,
            counters: CounterPair::parse(payload),
        })
    }
}

impl CounterPair {
    /// Extract `APSCounter` and the ZCL sequence number embedded in the hex
    /// `APSPlayload` (`0x` prefix, frame-control byte, optional
    /// manufacturer code, sequence number).
    pub fn parse(payload: &Payload) -> Result<Self, FrameError> {
        let raw_aps = int_value("APSCounter", required(payload, "APSCounter")?)?;
        let aps = u8::try_from(raw_aps).map_err(|_| FrameError::BadInteger {
            field: "APSCounter",
            value: raw_aps.to_string(),
        })?;

        let raw = required(payload, "APSPlayload")?
            .as_str()
            .ok_or(FrameError::WrongType {
                field: "APSPlayload",
                expected: "hex string",
            })?;
        let frame_control = hex_byte("APSPlayload", raw, 2..4)?;
        let zcl = if frame_control & ZCL_MANUFACTURER_SPECIFIC == 0 {
            hex_byte("APSPlayload", raw, 4..6)?
        } else {
            hex_byte("APSPlayload", raw, 8..10)?
        };

        Ok(Self { aps, zcl })
    }
}

// ── Field helpers ───────────────────────────────────────────────────

pub(crate) fn required<'a>(
    payload: &'a Payload,
    field: &'static str,
) -> Result<&'a Value, FrameError> {
    payload.get(field).ok_or(FrameError::MissingField { field })
}

/// Read an integer that may arrive as a JSON number or as a string literal
/// (`"0x0006"`, `"0o17"`, `"0b101"`, `"42"`).
pub(crate) fn int_value(field: &'static str, value: &Value) -> Result<i64, FrameError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| FrameError::BadInteger {
            field,
            value: n.to_string(),
        }),
        Value::String(s) => parse_int_literal(s).ok_or_else(|| FrameError::BadInteger {
            field,
            value: s.clone(),
        }),
        _ => Err(FrameError::WrongType {
            field,
            expected: "integer",
        }),
    }
}

fn parse_int_literal(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let prefixed = |prefixes: [&str; 2]| prefixes.iter().find_map(|p| body.strip_prefix(p));
    let magnitude = if let Some(hex) = prefixed(["0x", "0X"]) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = prefixed(["0o", "0O"]) {
        i64::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = prefixed(["0b", "0B"]) {
        i64::from_str_radix(bin, 2).ok()?
    } else if body.chars().all(|c| c.is_ascii_digit()) && !body.is_empty() {
        body.parse().ok()?
    } else {
        return None;
    };

    Some(if negative { -magnitude } else { magnitude })
}

fn hex_byte(
    field: &'static str,
    raw: &str,
    range: std::ops::Range<usize>,
) -> Result<u8, FrameError> {
    let digits = raw.get(range).ok_or_else(|| FrameError::Truncated {
        field,
        value: raw.to_owned(),
    })?;
    u8::from_str_radix(digits, 16).map_err(|_| FrameError::BadInteger {
        field,
        value: raw.to_owned(),
    })
}
