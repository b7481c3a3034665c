// ── Radio identity types ──
//
// `Ieee` keys Zigbee statistics, `MacAddress` keys everything Bluetooth.
// Both normalize on construction so hub keys and registry lookups agree
// regardless of the spelling the gateway used.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Ieee ────────────────────────────────────────────────────────────

/// 64-bit Zigbee extended address, rendered as `0x` + 16 upper-case hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ieee(String);

impl Ieee {
    /// Derive the extended address from a gateway device id such as
    /// `lumi.158d0001234567`. The suffix after the first `.` is left-padded
    /// with zeros to 16 digits.
    pub fn from_did(did: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidIdentifier {
            identifier: did.to_owned(),
            reason: reason.to_owned(),
        };

        let (_, suffix) = did
            .split_once('.')
            .ok_or_else(|| invalid("expected `<prefix>.<hex>`"))?;
        if suffix.is_empty() || suffix.len() > 16 {
            return Err(invalid("hex suffix must be 1 to 16 digits"));
        }
        if !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("suffix is not hexadecimal"));
        }

        Ok(Self(format!("0x{:0>16}", suffix.to_ascii_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ieee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse any common spelling: colon-separated, dash-separated or bare hex.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = bare_hex(raw)?;
        Some(Self::from_digits(&digits))
    }

    /// Parse an address as broadcast in BLE advertisements, where the six
    /// octets arrive in reverse order relative to the canonical form.
    pub fn from_reversed(raw: &str) -> Option<Self> {
        let digits = bare_hex(raw)?;
        let reversed: String = digits
            .as_bytes()
            .chunks(2)
            .rev()
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect();
        Some(Self::from_digits(&reversed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bare lowercase hex without separators.
    pub fn compact(&self) -> String {
        self.0.replace(':', "")
    }

    fn from_digits(digits: &str) -> Self {
        let octets: Vec<&str> = digits
            .as_bytes()
            .chunks(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
            .collect();
        Self(octets.join(":"))
    }
}

/// Strip separators and validate that exactly twelve hex digits remain.
fn bare_hex(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (digits.len() == 12 && digits.chars().all(|c| c.is_ascii_hexdigit())).then_some(digits)
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::InvalidIdentifier {
            identifier: s.to_owned(),
            reason: "expected six hex octets".into(),
        })
    }
}
