// ── Entities ──
//
// An entity owns the state derived from one device's frames and publishes
// it after every frame. Each module splits into a pure state machine
// (`apply` / `observe`, unit-tested without a hub) and the `Entity`
// wrapper that locks it, stamps the clock and publishes.

mod action;
mod ble;
mod gateway;
mod scanner;
mod sensor;
mod zigbee;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use action::{ActionEntity, ActionState};
pub use ble::{BleStats, BleStatsEntity};
pub use gateway::{Availability, AvailabilityFlag, GatewayStats, GatewayStatsEntity};
pub use scanner::{BleScanSession, BleScannerEntity, SCANNER_KEY, ScanOutcome};
pub use sensor::{SensorEntity, SensorState};
pub use zigbee::{DeviceStatsRecord, ZigbeeStats, ZigbeeStatsEntity};

use crate::error::FrameError;
use crate::model::Payload;

/// Something the hub delivers frames to.
pub trait Entity: Send + Sync + 'static {
    /// Identifier the host platform knows this entity by.
    fn entity_id(&self) -> &str;

    /// Hub key this entity subscribes under.
    fn subscription_key(&self) -> &str;

    /// Handle one frame. Must never panic on malformed input.
    fn on_frame(&self, payload: &Payload);

    fn on_attach(&self) {}

    fn on_detach(&self) {}
}

/// What a frame did to an entity's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State changed.
    Applied,
    /// Well-formed but carried nothing to record.
    Ignored,
    /// Malformed; prior state left intact.
    Discarded(FrameError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Host-facing id: `sensor.<device>_<kind>` with separators flattened.
pub fn entity_id(device: &str, kind: &str) -> String {
    let device: String = device
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("sensor.{device}_{kind}")
}

/// Entity state stays usable after a panicking publisher.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
