use std::collections::HashSet;

use crate::model::MacAddress;

/// Which hardware addresses the gateway already knows about.
pub trait DeviceRegistry: Send + Sync {
    /// Paired with the gateway.
    fn is_known_device(&self, mac: &MacAddress) -> bool;

    /// Declared in the default device list.
    fn is_default_device(&self, mac: &MacAddress) -> bool;
}

/// Fixed registry built once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    devices: HashSet<MacAddress>,
    defaults: HashSet<MacAddress>,
}

impl StaticRegistry {
    pub fn new(
        devices: impl IntoIterator<Item = MacAddress>,
        defaults: impl IntoIterator<Item = MacAddress>,
    ) -> Self {
        Self {
            devices: devices.into_iter().collect(),
            defaults: defaults.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len() + self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.defaults.is_empty()
    }
}

impl DeviceRegistry for StaticRegistry {
    fn is_known_device(&self, mac: &MacAddress) -> bool {
        self.devices.contains(mac)
    }

    fn is_default_device(&self, mac: &MacAddress) -> bool {
        self.defaults.contains(mac)
    }
}
