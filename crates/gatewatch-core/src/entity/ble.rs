// ── BLE advertisement counter ──
//
// No sequence numbers reach this layer for BLE, so the only statistic is
// how many advertisements arrived and when the last one did.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Entity, entity_id, lock};
use crate::error::CoreError;
use crate::model::{MacAddress, Payload, StateSnapshot, timestamp};
use crate::publish::Publisher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleStats {
    pub mac: MacAddress,
    pub messages_received: u64,
    pub last_seen: Option<DateTime<Utc>>,
}

impl BleStats {
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            messages_received: 0,
            last_seen: None,
        }
    }

    /// Count one advertisement, whatever it carried.
    pub fn record_message(&mut self, now: DateTime<Utc>) {
        self.messages_received = self.messages_received.saturating_add(1);
        self.last_seen = Some(now);
    }

    pub fn attributes(&self) -> Payload {
        let mut attrs = Payload::new();
        attrs.insert("mac".into(), Value::from(self.mac.as_str()));
        attrs.insert("msg_received".into(), self.messages_received.into());
        attrs
    }
}

/// Publishes the advertisement counter of one BLE device, keyed by MAC.
pub struct BleStatsEntity {
    entity_id: String,
    mac: MacAddress,
    stats: Mutex<Option<BleStats>>,
    publisher: Arc<dyn Publisher>,
}

impl BleStatsEntity {
    pub fn new(mac: &str, publisher: Arc<dyn Publisher>) -> Result<Self, CoreError> {
        let mac: MacAddress = mac.parse()?;
        Ok(Self {
            entity_id: entity_id(mac.as_str(), "ble"),
            mac,
            stats: Mutex::new(None),
            publisher,
        })
    }

    pub fn stats(&self) -> Option<BleStats> {
        lock(&self.stats).clone()
    }
}

impl Entity for BleStatsEntity {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn subscription_key(&self) -> &str {
        self.mac.as_str()
    }

    fn on_frame(&self, _payload: &Payload) {
        let snapshot = {
            let mut guard = lock(&self.stats);
            let Some(stats) = guard.as_mut() else {
                return;
            };
            stats.record_message(Utc::now());
            StateSnapshot::new(
                self.entity_id.clone(),
                stats.last_seen.map(|at| Value::String(timestamp(at))),
                stats.attributes(),
            )
        };
        self.publisher.publish(snapshot);
    }

    fn on_attach(&self) {
        let mut guard = lock(&self.stats);
        if guard.is_none() {
            *guard = Some(BleStats::new(self.mac.clone()));
        }
    }

    fn on_detach(&self) {
        *lock(&self.stats) = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;
    use crate::publish::SnapshotBus;

    #[test]
    fn every_advertisement_counts() {
        let mut stats = BleStats::new(MacAddress::parse("a4c138000001").unwrap());
        let t0 = Utc::now();
        stats.record_message(t0);
        stats.record_message(t0 + TimeDelta::seconds(5));

        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.last_seen, Some(t0 + TimeDelta::seconds(5)));
        assert_eq!(stats.attributes().get("msg_received"), Some(&json!(2)));
        assert_eq!(stats.attributes().get("mac"), Some(&json!("a4:c1:38:00:00:01")));
    }

    #[test]
    fn entity_ignores_frames_until_attached() {
        let bus = Arc::new(SnapshotBus::new());
        let entity = BleStatsEntity::new("A4:C1:38:00:00:01", bus.clone()).unwrap();
        assert_eq!(entity.subscription_key(), "a4:c1:38:00:00:01");

        entity.on_frame(&Payload::new());
        assert!(bus.latest(entity.entity_id()).is_none());

        entity.on_attach();
        entity.on_frame(&Payload::new());
        let snap = bus.latest(entity.entity_id()).unwrap();
        assert_eq!(snap.attributes.get("msg_received"), Some(&json!(1)));
        assert!(snap.state.is_some());

        entity.on_detach();
        assert!(entity.stats().is_none());
    }

    #[test]
    fn invalid_mac_is_rejected() {
        let bus = Arc::new(SnapshotBus::new());
        assert!(BleStatsEntity::new("not-a-mac", bus).is_err());
    }
}
