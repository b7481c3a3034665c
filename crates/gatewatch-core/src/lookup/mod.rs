// ── Read-only collaborators ──
//
// Lookups the entities consult but never mutate. Each is a trait so the
// host can plug in its own source; the in-memory implementations here
// are what the CLI builds from configuration.

mod ble;
mod cluster;
mod registry;

pub use ble::{BleModelResolver, ProductTable};
pub use cluster::{ClusterNames, ZclClusters};
pub use registry::{DeviceRegistry, StaticRegistry};
