use std::collections::HashMap;

/// Resolves the device model advertised in a BLE service payload.
pub trait BleModelResolver: Send + Sync {
    /// `None` when the payload does not identify a model (yet).
    fn resolve_model(&self, advertisement: &str) -> Option<String>;
}

/// MiBeacon product-id table.
///
/// The payload is the hex-encoded service data: a two-byte frame control
/// followed by the little-endian product id.
#[derive(Debug, Clone)]
pub struct ProductTable {
    models: HashMap<u16, String>,
}

impl ProductTable {
    /// Products shipped with the table; configuration can extend it.
    const BUILTIN: [(u16, &'static str); 6] = [
        (152, "HHCCJCY01"),
        (426, "LYWSDCGQ"),
        (1115, "LYWSD02"),
        (1371, "LYWSD03MMC"),
        (1398, "CGD1"),
        (1647, "CGDK2"),
    ];

    /// An empty table.
    pub fn empty() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Add or replace one product id.
    pub fn insert(&mut self, product_id: u16, model: impl Into<String>) {
        self.models.insert(product_id, model.into());
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Product id carried by a MiBeacon payload.
    pub fn product_id(advertisement: &str) -> Option<u16> {
        let hex = advertisement
            .strip_prefix("0x")
            .unwrap_or(advertisement);
        let lo = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
        let hi = u8::from_str_radix(hex.get(6..8)?, 16).ok()?;
        Some(u16::from_le_bytes([lo, hi]))
    }
}

impl Default for ProductTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (id, model) in Self::BUILTIN {
            table.insert(id, model);
        }
        table
    }
}

impl BleModelResolver for ProductTable {
    fn resolve_model(&self, advertisement: &str) -> Option<String> {
        let id = Self::product_id(advertisement)?;
        self.models.get(&id).cloned()
    }
}
