use std::borrow::Cow;

/// Human-readable names for ZCL cluster ids.
pub trait ClusterNames: Send + Sync {
    /// Name of the cluster, or the decimal id when unknown.
    fn cluster_name(&self, id: u16) -> Cow<'static, str>;
}

/// Built-in table of the clusters Xiaomi/Aqara devices report on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZclClusters;

impl ZclClusters {
    pub const fn lookup(id: u16) -> Option<&'static str> {
        match id {
            0x0000 => Some("Basic"),
            0x0001 => Some("PowerCfg"),
            0x0003 => Some("Identify"),
            0x0006 => Some("OnOff"),
            0x0008 => Some("LevelCtrl"),
            0x000A => Some("Time"),
            0x000C => Some("AnalogInput"),
            0x0012 => Some("Multistate"),
            0x0019 => Some("OTA"),
            0x0101 => Some("DoorLock"),
            0x0102 => Some("WindowCovering"),
            0x0300 => Some("LightColor"),
            0x0400 => Some("Illuminance"),
            0x0402 => Some("Temperature"),
            0x0403 => Some("Pressure"),
            0x0405 => Some("Humidity"),
            0x0406 => Some("Occupancy"),
            0x0500 => Some("IasZone"),
            0x0702 => Some("Metering"),
            0x0B04 => Some("ElectrMeasur"),
            0xFCC0 => Some("Xiaomi"),
            _ => None,
        }
    }
}

impl ClusterNames for ZclClusters {
    fn cluster_name(&self, id: u16) -> Cow<'static, str> {
        Self::lookup(id).map_or_else(|| Cow::Owned(id.to_string()), Cow::Borrowed)
    }
}
