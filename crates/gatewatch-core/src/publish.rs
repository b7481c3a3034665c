// ── Publication to the host platform ──
//
// Entities hand their state to a `Publisher`; it is fire-and-forget and
// never fails back into the entity. `SnapshotBus` is the in-process
// implementation: latest snapshot per entity in a `DashMap`, plus
// broadcast channels for live consumers.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{PlatformEvent, StateSnapshot};

const SNAPSHOT_CHANNEL_SIZE: usize = 1024;
const EVENT_CHANNEL_SIZE: usize = 256;

/// Sink for entity state and platform events.
pub trait Publisher: Send + Sync {
    fn publish(&self, snapshot: StateSnapshot);

    fn fire(&self, event: PlatformEvent);
}

/// Lock-free publication sink with replayable latest state.
pub struct SnapshotBus {
    latest: DashMap<String, Arc<StateSnapshot>>,
    snapshot_tx: broadcast::Sender<Arc<StateSnapshot>>,
    event_tx: broadcast::Sender<Arc<PlatformEvent>>,
}

impl SnapshotBus {
    pub fn new() -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_SIZE);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            latest: DashMap::new(),
            snapshot_tx,
            event_tx,
        }
    }

    /// Most recent snapshot published by an entity.
    pub fn latest(&self, entity_id: &str) -> Option<Arc<StateSnapshot>> {
        self.latest.get(entity_id).map(|r| Arc::clone(r.value()))
    }

    /// Latest snapshot of every entity that has published, sorted by id.
    pub fn all_latest(&self) -> Vec<Arc<StateSnapshot>> {
        let mut all: Vec<_> = self.latest.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        all
    }

    /// Live stream of every published snapshot.
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<Arc<StateSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Live stream of platform events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Arc<PlatformEvent>> {
        self.event_tx.subscribe()
    }
}

impl Default for SnapshotBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for SnapshotBus {
    fn publish(&self, snapshot: StateSnapshot) {
        let snapshot = Arc::new(snapshot);
        self.latest
            .insert(snapshot.entity_id.clone(), Arc::clone(&snapshot));
        // Ignore send errors -- just means no active subscribers right now
        let _ = self.snapshot_tx.send(snapshot);
    }

    fn fire(&self, event: PlatformEvent) {
        let _ = self.event_tx.send(Arc::new(event));
    }
}
