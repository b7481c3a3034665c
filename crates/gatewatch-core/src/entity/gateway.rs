// ── Gateway presence ──
//
// Empty notification ticks stamp "last seen available"; payloads carry
// gateway metadata and only extend the attribute map.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Entity, Outcome, entity_id, lock};
use crate::model::{Payload, StateSnapshot, timestamp};
use crate::publish::Publisher;

/// Availability flag exposed by the gateway transport.
pub trait Availability: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Shared boolean the transport flips as the connection comes and goes.
#[derive(Debug, Clone)]
pub struct AvailabilityFlag(Arc<AtomicBool>);

impl AvailabilityFlag {
    pub fn new(available: bool) -> Self {
        Self(Arc::new(AtomicBool::new(available)))
    }

    pub fn set(&self, available: bool) {
        self.0.store(available, Ordering::Release);
    }
}

impl Default for AvailabilityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Availability for AvailabilityFlag {
    fn is_available(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayStats {
    /// Formatted timestamp of the last tick seen while available; `None`
    /// after a tick while the gateway was unreachable.
    pub state: Option<String>,
    pub attributes: Payload,
}

impl GatewayStats {
    pub fn apply(&mut self, payload: &Payload, available: bool, now: DateTime<Utc>) -> Outcome {
        if payload.is_empty() {
            self.state = available.then(|| timestamp(now));
        } else {
            self.attributes
                .extend(payload.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Outcome::Applied
    }
}

/// Publishes gateway presence and metadata.
pub struct GatewayStatsEntity {
    entity_id: String,
    key: String,
    stats: Mutex<Option<GatewayStats>>,
    availability: Arc<dyn Availability>,
    publisher: Arc<dyn Publisher>,
}

impl GatewayStatsEntity {
    pub fn new(
        did: &str,
        availability: Arc<dyn Availability>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            entity_id: entity_id(did, "gateway"),
            key: did.to_owned(),
            stats: Mutex::new(None),
            availability,
            publisher,
        }
    }

    pub fn stats(&self) -> Option<GatewayStats> {
        lock(&self.stats).clone()
    }

    fn apply_and_publish(&self, payload: &Payload) {
        let snapshot = {
            let mut guard = lock(&self.stats);
            let Some(stats) = guard.as_mut() else {
                return;
            };
            stats.apply(payload, self.availability.is_available(), Utc::now());
            StateSnapshot::new(
                self.entity_id.clone(),
                stats.state.clone().map(Value::String),
                stats.attributes.clone(),
            )
        };
        self.publisher.publish(snapshot);
    }
}

impl Entity for GatewayStatsEntity {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn subscription_key(&self) -> &str {
        &self.key
    }

    fn on_frame(&self, payload: &Payload) {
        self.apply_and_publish(payload);
    }

    /// Stamp availability as soon as the entity is registered.
    fn on_attach(&self) {
        {
            let mut guard = lock(&self.stats);
            if guard.is_none() {
                *guard = Some(GatewayStats::default());
            }
        }
        self.apply_and_publish(&Payload::new());
    }

    fn on_detach(&self) {
        *lock(&self.stats) = None;
    }
}
