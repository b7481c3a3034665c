// ── Domain model ──
//
// Identity types, the frame union fed to entities, and the snapshot
// types entities publish.

pub mod address;
pub mod frame;
pub mod snapshot;

pub use address::{Ieee, MacAddress};
pub use frame::{CounterPair, DEVICE_STATE_UNRESPONSIVE, Payload, Telemetry, ZigbeeFrame};
pub use snapshot::{CLICK_EVENT, PlatformEvent, StateSnapshot, timestamp};
