// ── BLE advertiser inventory ──
//
// Classifies every advertiser heard during a session as known or unknown
// to the gateway, at most once per advertiser. Advertisements whose
// payload does not resolve to a model are skipped without being marked,
// so a later, decodable advertisement from the same device still counts.

use std::sync::{Arc, Mutex};

use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, trace};

use super::{Entity, lock};
use crate::error::FrameError;
use crate::lookup::{BleModelResolver, DeviceRegistry};
use crate::model::frame::required;
use crate::model::{MacAddress, Payload, StateSnapshot};
use crate::publish::Publisher;

/// Hub key raw advertisements are delivered under.
pub const SCANNER_KEY: &str = "ble_scanner";

/// Result of observing one advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// First decodable advertisement from this advertiser.
    Classified { known: bool, descriptor: String },
    /// Advertiser already classified this session.
    Duplicate,
    /// Payload did not resolve to a model; advertiser left unmarked.
    Unresolved,
    /// Frame carries no advertiser identifier.
    NoAdvertiser,
    /// Identifier or payload unusable.
    Malformed(FrameError),
}

impl ScanOutcome {
    /// Whether the session's published state may have changed.
    pub fn should_publish(&self) -> bool {
        matches!(self, Self::Classified { .. } | Self::NoAdvertiser)
    }
}

/// Advertisers seen during one scanner lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BleScanSession {
    processed: IndexSet<String>,
    known: Vec<String>,
    unknown: Vec<String>,
}

impl BleScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.processed.len()
    }

    pub fn known(&self) -> &[String] {
        &self.known
    }

    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    pub fn is_processed(&self, advertiser: &str) -> bool {
        self.processed.contains(advertiser)
    }

    /// Observe one raw advertisement (`mac` as broadcast, `adv` hex payload).
    pub fn observe(
        &mut self,
        payload: &Payload,
        registry: &dyn DeviceRegistry,
        resolver: &dyn BleModelResolver,
    ) -> ScanOutcome {
        let Some(raw_mac) = payload.get("mac") else {
            return ScanOutcome::NoAdvertiser;
        };
        let Some(advertiser) = raw_mac.as_str() else {
            return ScanOutcome::Malformed(FrameError::WrongType {
                field: "mac",
                expected: "string",
            });
        };

        if self.processed.contains(advertiser) {
            return ScanOutcome::Duplicate;
        }

        let Some(mac) = MacAddress::from_reversed(advertiser) else {
            return ScanOutcome::Malformed(FrameError::BadInteger {
                field: "mac",
                value: advertiser.to_owned(),
            });
        };
        let advertisement = match required(payload, "adv") {
            Ok(Value::String(adv)) => adv,
            Ok(_) => {
                return ScanOutcome::Malformed(FrameError::WrongType {
                    field: "adv",
                    expected: "hex string",
                });
            }
            Err(err) => return ScanOutcome::Malformed(err),
        };

        let Some(model) = resolver.resolve_model(advertisement) else {
            return ScanOutcome::Unresolved;
        };

        self.processed.insert(advertiser.to_owned());

        let known = registry.is_known_device(&mac) || registry.is_default_device(&mac);
        let descriptor = format!("{mac} {model}");
        if known {
            self.known.push(descriptor.clone());
        } else {
            self.unknown.push(descriptor.clone());
        }
        ScanOutcome::Classified { known, descriptor }
    }

    pub fn attributes(&self) -> Payload {
        let mut attrs = Payload::new();
        attrs.insert("known_macs".into(), self.known.clone().into());
        attrs.insert("unknown_macs".into(), self.unknown.clone().into());
        attrs
    }
}

/// Scanner entity: one session per attachment.
pub struct BleScannerEntity {
    entity_id: String,
    session: Mutex<Option<BleScanSession>>,
    registry: Arc<dyn DeviceRegistry>,
    resolver: Arc<dyn BleModelResolver>,
    publisher: Arc<dyn Publisher>,
}

impl BleScannerEntity {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        resolver: Arc<dyn BleModelResolver>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            entity_id: format!("sensor.{SCANNER_KEY}"),
            session: Mutex::new(None),
            registry,
            resolver,
            publisher,
        }
    }

    pub fn session(&self) -> Option<BleScanSession> {
        lock(&self.session).clone()
    }

    fn snapshot(&self, session: &BleScanSession) -> StateSnapshot {
        StateSnapshot::new(
            self.entity_id.clone(),
            (session.count() > 0).then(|| Value::from(session.count())),
            session.attributes(),
        )
    }
}

impl Entity for BleScannerEntity {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn subscription_key(&self) -> &str {
        SCANNER_KEY
    }

    fn on_frame(&self, payload: &Payload) {
        let snapshot = {
            let mut guard = lock(&self.session);
            let Some(session) = guard.as_mut() else {
                return;
            };
            let outcome = session.observe(payload, self.registry.as_ref(), self.resolver.as_ref());
            match &outcome {
                ScanOutcome::Classified { known, descriptor } => {
                    debug!(descriptor = %descriptor, known, "ble advertiser classified");
                }
                ScanOutcome::Malformed(err) => debug!(error = %err, "discarding advertisement"),
                other => trace!(outcome = ?other, "advertisement skipped"),
            }
            if !outcome.should_publish() {
                return;
            }
            self.snapshot(session)
        };
        self.publisher.publish(snapshot);
    }

    fn on_attach(&self) {
        let mut guard = lock(&self.session);
        if guard.is_none() {
            *guard = Some(BleScanSession::new());
        }
    }

    fn on_detach(&self) {
        *lock(&self.session) = None;
    }
}
