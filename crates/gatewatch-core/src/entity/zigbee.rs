// ── Zigbee link statistics ──

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::{Entity, Outcome, entity_id, lock};
use crate::error::{CoreError, FrameError};
use crate::lookup::ClusterNames;
use crate::model::{
    DEVICE_STATE_UNRESPONSIVE, Ieee, Payload, StateSnapshot, Telemetry, ZigbeeFrame, timestamp,
};
use crate::publish::Publisher;
use crate::sequence::SequenceLossTracker;

/// Per-device link statistics.
///
/// Every counter only ever grows for the life of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatsRecord {
    pub ieee: Ieee,
    pub network_address: Option<String>,
    pub link_quality: Option<i64>,
    pub rssi: Option<i64>,
    pub messages_received: u64,
    pub messages_missed: u64,
    /// Loss estimate of the most recent message.
    pub last_missed: u8,
    /// Cluster name of the most recent message.
    pub last_message_kind: Option<String>,
    pub unresponsive_count: u64,
    pub last_seen: Option<DateTime<Utc>>,
    /// Routing report fields (`parent`, ...).
    pub extra: Payload,
}

impl DeviceStatsRecord {
    pub fn new(ieee: Ieee) -> Self {
        Self {
            ieee,
            network_address: None,
            link_quality: None,
            rssi: None,
            messages_received: 0,
            messages_missed: 0,
            last_missed: 0,
            last_message_kind: None,
            unresponsive_count: 0,
            last_seen: None,
            extra: Payload::new(),
        }
    }

    /// Attribute map as published. Routing fields never shadow counters.
    pub fn attributes(&self) -> Payload {
        let mut attrs = Payload::new();
        attrs.insert("ieee".into(), Value::from(self.ieee.as_str()));
        attrs.insert("nwk".into(), self.network_address.clone().into());
        attrs.insert("msg_received".into(), self.messages_received.into());
        attrs.insert("msg_missed".into(), self.messages_missed.into());
        attrs.insert("unresponsive".into(), self.unresponsive_count.into());
        attrs.insert("last_missed".into(), self.last_missed.into());
        if let Some(lqi) = self.link_quality {
            attrs.insert("link_quality".into(), lqi.into());
        }
        if let Some(rssi) = self.rssi {
            attrs.insert("rssi".into(), rssi.into());
        }
        if let Some(kind) = &self.last_message_kind {
            attrs.insert("last_msg".into(), kind.clone().into());
        }
        for (key, value) in &self.extra {
            if !attrs.contains_key(key) {
                attrs.insert(key.clone(), value.clone());
            }
        }
        attrs
    }
}

// ── State machine ───────────────────────────────────────────────────

/// Record plus loss tracker for one device.
#[derive(Debug, Clone)]
pub struct ZigbeeStats {
    record: DeviceStatsRecord,
    tracker: SequenceLossTracker,
}

impl ZigbeeStats {
    pub fn new(ieee: Ieee) -> Self {
        Self {
            record: DeviceStatsRecord::new(ieee),
            tracker: SequenceLossTracker::new(),
        }
    }

    pub fn record(&self) -> &DeviceStatsRecord {
        &self.record
    }

    /// Apply one frame received at `now`.
    pub fn apply(
        &mut self,
        payload: &Payload,
        clusters: &dyn ClusterNames,
        now: DateTime<Utc>,
    ) -> Outcome {
        let frame = match ZigbeeFrame::parse(payload) {
            Ok(frame) => frame,
            Err(err) => return Outcome::Discarded(err),
        };

        match frame {
            ZigbeeFrame::Telemetry(telemetry) => {
                self.apply_telemetry(telemetry, clusters, now);
                Outcome::Applied
            }
            ZigbeeFrame::RoutingInfo { ago, fields } => {
                let Some(seen) = now.checked_sub_signed(ago) else {
                    return Outcome::Discarded(FrameError::WrongType {
                        field: "ago",
                        expected: "seconds within the clock range",
                    });
                };
                self.record.last_seen = Some(seen);
                self.record.extra.extend(fields);
                Outcome::Applied
            }
            ZigbeeFrame::DeviceState { code } if code == DEVICE_STATE_UNRESPONSIVE => {
                self.record.unresponsive_count = self.record.unresponsive_count.saturating_add(1);
                Outcome::Applied
            }
            ZigbeeFrame::DeviceState { .. } | ZigbeeFrame::Heartbeat => Outcome::Ignored,
        }
    }

    fn apply_telemetry(
        &mut self,
        telemetry: Telemetry,
        clusters: &dyn ClusterNames,
        now: DateTime<Utc>,
    ) {
        let record = &mut self.record;
        let cluster = clusters.cluster_name(telemetry.cluster_id);

        record.network_address = Some(telemetry.source_address);
        record.link_quality = Some(telemetry.link_quality);
        record.rssi = Some(telemetry.rssi);
        record.messages_received = record.messages_received.saturating_add(1);

        match telemetry.counters {
            Ok(counters) => {
                let previous = self.tracker.last();
                if let Some(miss) = self.tracker.observe(counters) {
                    record.messages_missed = record.messages_missed.saturating_add(u64::from(miss));
                    record.last_missed = miss;
                    if miss > 0 {
                        debug!(
                            ieee = %record.ieee,
                            miss,
                            cluster = %cluster,
                            ?previous,
                            current = ?counters,
                            "msg missed"
                        );
                    }
                }
            }
            Err(err) => {
                debug!(
                    ieee = %record.ieee,
                    error = %err,
                    "sequence counters unreadable, skipping loss estimate"
                );
            }
        }

        record.last_message_kind = Some(cluster.into_owned());
        record.last_seen = Some(now);
    }
}

// ── Entity ──────────────────────────────────────────────────────────

/// Publishes link statistics for one Zigbee device, keyed by IEEE address.
pub struct ZigbeeStatsEntity {
    entity_id: String,
    ieee: Ieee,
    stats: Mutex<Option<ZigbeeStats>>,
    clusters: Arc<dyn ClusterNames>,
    publisher: Arc<dyn Publisher>,
}

impl ZigbeeStatsEntity {
    /// Build the entity for a gateway device id such as `lumi.158d0001a2b3c4`.
    pub fn new(
        did: &str,
        clusters: Arc<dyn ClusterNames>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            entity_id: entity_id(did, "zigbee"),
            ieee: Ieee::from_did(did)?,
            stats: Mutex::new(None),
            clusters,
            publisher,
        })
    }

    pub fn ieee(&self) -> &Ieee {
        &self.ieee
    }

    /// Current record, `None` while detached.
    pub fn record(&self) -> Option<DeviceStatsRecord> {
        lock(&self.stats).as_ref().map(|s| s.record().clone())
    }

    fn snapshot(&self, record: &DeviceStatsRecord) -> StateSnapshot {
        StateSnapshot::new(
            self.entity_id.clone(),
            record.last_seen.map(|at| Value::String(timestamp(at))),
            record.attributes(),
        )
    }
}

impl Entity for ZigbeeStatsEntity {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn subscription_key(&self) -> &str {
        self.ieee.as_str()
    }

    fn on_frame(&self, payload: &Payload) {
        let snapshot = {
            let mut guard = lock(&self.stats);
            let Some(stats) = guard.as_mut() else {
                return;
            };
            let outcome = stats.apply(payload, self.clusters.as_ref(), Utc::now());
            if let Outcome::Discarded(err) = outcome {
                debug!(ieee = %self.ieee, error = %err, "discarding zigbee frame");
            }
            self.snapshot(stats.record())
        };
        self.publisher.publish(snapshot);
    }

    fn on_attach(&self) {
        let mut guard = lock(&self.stats);
        if guard.is_none() {
            *guard = Some(ZigbeeStats::new(self.ieee.clone()));
        }
    }

    fn on_detach(&self) {
        *lock(&self.stats) = None;
    }
}
