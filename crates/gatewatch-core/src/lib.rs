// gatewatch-core: Stateful decoding and link statistics between a wireless gateway and its host.

pub mod config;
pub mod entity;
pub mod error;
pub mod gesture;
pub mod hub;
pub mod lookup;
pub mod model;
pub mod publish;
pub mod sequence;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::CoreConfig;
pub use error::{CoreError, FrameError};
pub use hub::{Attachment, Callback, StatsSubscriptionHub, SubscriptionId};
pub use publish::{Publisher, SnapshotBus};
pub use sequence::SequenceLossTracker;

pub use entity::{
    // Entities
    ActionEntity, BleScannerEntity, BleStatsEntity, Entity, GatewayStatsEntity, SensorEntity,
    ZigbeeStatsEntity,
    // State
    ActionState, BleScanSession, BleStats, DeviceStatsRecord, GatewayStats, Outcome, ScanOutcome,
    SensorState, ZigbeeStats,
    // Availability
    Availability, AvailabilityFlag, SCANNER_KEY,
};
pub use lookup::{
    BleModelResolver, ClusterNames, DeviceRegistry, ProductTable, StaticRegistry, ZclClusters,
};
pub use model::{
    CLICK_EVENT, CounterPair, Ieee, MacAddress, Payload, PlatformEvent, StateSnapshot, ZigbeeFrame,
};
