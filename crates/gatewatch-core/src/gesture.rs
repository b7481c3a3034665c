// ── Gesture decoding ──
//
// Maps the attribute set of one frame to at most one action label.
// Rules are tried in a fixed priority order; within a rule the first
// key (in arrival order) satisfying its predicate is used.
//
// Code tables follow zigbee-herdsman-converters' Xiaomi multistate
// conventions.

use serde_json::Value;
use strum::{Display, IntoStaticStr};
use tracing::trace;

use crate::model::Payload;

/// Attribute under which the decoded label is stored.
pub const ACTION_ATTR: &str = "action";

/// Label for codes missing from a table.
pub const UNKNOWN_LABEL: &str = "unknown";

// ── Code tables ─────────────────────────────────────────────────────

/// Press patterns reported by single and multi-button switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Click {
    Single,
    Double,
    Triple,
    Quadruple,
    /// Only seen on the Yeelight dimmer.
    Quintuple,
    Hold,
    Release,
    Shake,
    Many,
}

impl Click {
    /// Single-button table.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::Quadruple),
            5 => Some(Self::Quintuple),
            16 => Some(Self::Hold),
            17 => Some(Self::Release),
            18 => Some(Self::Shake),
            128 => Some(Self::Many),
            _ => None,
        }
    }

    /// Both-buttons table; the codes are offset from the single table.
    pub const fn from_both_code(code: i64) -> Option<Self> {
        match code {
            4 => Some(Self::Single),
            5 => Some(Self::Double),
            6 => Some(Self::Triple),
            16 => Some(Self::Hold),
            17 => Some(Self::Release),
            _ => None,
        }
    }
}

/// Motion events of the vibration sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Motion {
    Vibration,
    Tilt,
    Drop,
}

impl Motion {
    /// Raw value announcing a tilt; the angle follows in a separate frame.
    pub const TILT_CODE: i64 = 2;

    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Vibration),
            2 => Some(Self::Tilt),
            3 => Some(Self::Drop),
            _ => None,
        }
    }
}

// ── Decoder ─────────────────────────────────────────────────────────

/// A decoded action: the label plus the attribute set to publish with it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAction {
    pub label: String,
    pub attributes: Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Button,
    ButtonBoth,
    ButtonNamed,
    Vibration,
    TiltAngle,
}

const PRIORITY: [Rule; 5] = [
    Rule::Button,
    Rule::ButtonBoth,
    Rule::ButtonNamed,
    Rule::Vibration,
    Rule::TiltAngle,
];

impl Rule {
    fn matches(self, key: &str, value: &Value) -> bool {
        match self {
            Self::Button => key == "button",
            Self::ButtonBoth => key.starts_with("button_both"),
            Self::ButtonNamed => {
                key != "button" && key.starts_with("button") && !key.starts_with("button_both")
            }
            Self::Vibration => key == "vibration" && value.as_i64() != Some(Motion::TILT_CODE),
            Self::TiltAngle => key == "tilt_angle",
        }
    }

    fn apply(self, payload: &Payload, key: &str, value: &Value) -> Option<DecodedAction> {
        let code = value.as_i64();
        let label = match self {
            Self::Button => {
                // Some firmware repeats the last button value in its
                // battery heartbeat.
                if payload.contains_key("battery") {
                    trace!("button value in heartbeat frame, ignoring");
                    return None;
                }
                table_label(code.and_then(Click::from_code))
            }
            Self::ButtonBoth => {
                format!("{key}_{}", table_label(code.and_then(Click::from_both_code)))
            }
            Self::ButtonNamed => format!("{key}_{}", table_label(code.and_then(Click::from_code))),
            Self::Vibration => table_label(code.and_then(Motion::from_code)),
            Self::TiltAngle => {
                let label = Motion::Tilt.to_string();
                let mut attributes = Payload::new();
                attributes.insert("vibration".into(), Value::from(Motion::TILT_CODE));
                attributes.insert("angle".into(), value.clone());
                attributes.insert(ACTION_ATTR.into(), Value::String(label.clone()));
                return Some(DecodedAction { label, attributes });
            }
        };

        let mut attributes = payload.clone();
        attributes.insert(ACTION_ATTR.into(), Value::String(label.clone()));
        Some(DecodedAction { label, attributes })
    }
}

fn table_label<T: Into<&'static str>>(entry: Option<T>) -> String {
    entry.map_or(UNKNOWN_LABEL, Into::into).to_owned()
}

/// Decode one frame into at most one action.
///
/// Priority: `button` > `button_both*` > `button*` > `vibration` (except
/// the pending-tilt code) > `tilt_angle`. Frames carrying several competing
/// keys are not produced by real devices; the first rule to match decides.
pub fn decode(payload: &Payload) -> Option<DecodedAction> {
    PRIORITY.iter().find_map(|rule| {
        payload
            .iter()
            .find(|(key, value)| rule.matches(key, value))
            .map(|(key, value)| rule.apply(payload, key, value))
    })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    fn label(value: Value) -> Option<String> {
        decode(&payload(value)).map(|d| d.label)
    }

    #[test]
    fn single_button_press() {
        let decoded = decode(&payload(json!({"button": 1}))).unwrap();
        assert_eq!(decoded.label, "single");
        assert_eq!(decoded.attributes, payload(json!({"button": 1, "action": "single"})));
    }

    #[test]
    fn button_table_covers_every_code() {
        for (code, expected) in [
            (2, "double"),
            (3, "triple"),
            (4, "quadruple"),
            (5, "quintuple"),
            (16, "hold"),
            (17, "release"),
            (18, "shake"),
            (128, "many"),
        ] {
            assert_eq!(label(json!({"button": code})).as_deref(), Some(expected));
        }
    }

    #[test]
    fn unmapped_code_is_unknown() {
        assert_eq!(label(json!({"button": 99})).as_deref(), Some("unknown"));
        assert_eq!(label(json!({"button": "x"})).as_deref(), Some("unknown"));
    }

    #[test]
    fn heartbeat_with_button_is_suppressed() {
        assert_eq!(label(json!({"button": 1, "battery": 90})), None);
    }

    #[test]
    fn both_buttons_use_their_own_table() {
        assert_eq!(
            label(json!({"button_both_1": 4})).as_deref(),
            Some("button_both_1_single")
        );
        assert_eq!(
            label(json!({"button_both": 99})).as_deref(),
            Some("button_both_unknown")
        );
    }

    #[test]
    fn named_button_uses_single_table() {
        assert_eq!(label(json!({"button_2": 2})).as_deref(), Some("button_2_double"));
    }

    #[test]
    fn vibration_events() {
        assert_eq!(label(json!({"vibration": 1})).as_deref(), Some("vibration"));
        assert_eq!(label(json!({"vibration": 3})).as_deref(), Some("drop"));
        assert_eq!(label(json!({"vibration": 7})).as_deref(), Some("unknown"));
    }

    #[test]
    fn pending_tilt_waits_for_angle() {
        assert_eq!(label(json!({"vibration": 2})), None);
    }

    #[test]
    fn tilt_angle_builds_compound_event() {
        let decoded = decode(&payload(json!({"tilt_angle": 45, "battery": 80}))).unwrap();
        assert_eq!(decoded.label, "tilt");
        assert_eq!(
            decoded.attributes,
            payload(json!({"vibration": 2, "angle": 45, "action": "tilt"}))
        );
    }

    #[test]
    fn unrelated_attributes_produce_nothing() {
        assert_eq!(label(json!({"temperature": 21.4, "humidity": 40})), None);
        assert_eq!(label(json!({})), None);
    }

    #[test]
    fn priority_is_independent_of_arrival_order() {
        assert_eq!(
            label(json!({"vibration": 1, "button_1": 1})).as_deref(),
            Some("button_1_single")
        );
        assert_eq!(
            label(json!({"button_1": 2, "button_both_1": 5})).as_deref(),
            Some("button_both_1_double")
        );
    }

    #[test]
    fn pending_tilt_does_not_shadow_angle() {
        assert_eq!(
            label(json!({"vibration": 2, "tilt_angle": 12})).as_deref(),
            Some("tilt")
        );
    }
}
