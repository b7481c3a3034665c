// ── Attribute sensor ──
//
// Mirrors one attribute of a device's decoded frames (temperature,
// humidity, illuminance and so on). Frames without the attribute leave the
// value alone but are still republished.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{Entity, Outcome, entity_id, lock};
use crate::model::{Payload, StateSnapshot};
use crate::publish::Publisher;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorState {
    /// Last value seen for the attribute; `None` until the first one.
    pub value: Option<Value>,
}

impl SensorState {
    pub fn apply(&mut self, attr: &str, payload: &Payload) -> Outcome {
        match payload.get(attr) {
            Some(value) => {
                self.value = Some(value.clone());
                Outcome::Applied
            }
            None => Outcome::Ignored,
        }
    }
}

/// Publishes a single attribute of one device.
pub struct SensorEntity {
    entity_id: String,
    key: String,
    attr: String,
    state: Mutex<Option<SensorState>>,
    publisher: Arc<dyn Publisher>,
}

impl SensorEntity {
    pub fn new(key: &str, attr: &str, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            entity_id: entity_id(key, attr),
            key: key.to_owned(),
            attr: attr.to_owned(),
            state: Mutex::new(None),
            publisher,
        }
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn state(&self) -> Option<SensorState> {
        lock(&self.state).clone()
    }
}

impl Entity for SensorEntity {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn subscription_key(&self) -> &str {
        &self.key
    }

    fn on_frame(&self, payload: &Payload) {
        let mut guard = lock(&self.state);
        let Some(state) = guard.as_mut() else {
            return;
        };
        state.apply(&self.attr, payload);
        self.publisher.publish(StateSnapshot::new(
            self.entity_id.clone(),
            state.value.clone(),
            Payload::new(),
        ));
    }

    fn on_attach(&self) {
        let mut guard = lock(&self.state);
        if guard.is_none() {
            *guard = Some(SensorState::default());
        }
    }

    fn on_detach(&self) {
        *lock(&self.state) = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::publish::SnapshotBus;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn value_tracks_the_attribute_only() {
        let mut state = SensorState::default();

        assert_eq!(state.apply("temperature", &payload(json!({"humidity": 40}))), Outcome::Ignored);
        assert_eq!(state.value, None);

        assert!(state.apply("temperature", &payload(json!({"temperature": 21.5}))).is_applied());
        assert_eq!(state.apply("temperature", &payload(json!({"battery": 90}))), Outcome::Ignored);
        assert_eq!(state.value, Some(json!(21.5)));
    }

    #[test]
    fn every_frame_is_republished() {
        let bus = Arc::new(SnapshotBus::new());
        let mut snapshots = bus.subscribe_snapshots();
        let entity = SensorEntity::new("lumi.158d0001", "temperature", bus.clone());
        assert_eq!(entity.entity_id(), "sensor.lumi_158d0001_temperature");

        entity.on_frame(&payload(json!({"temperature": 20})));
        assert!(snapshots.try_recv().is_err());

        entity.on_attach();
        entity.on_frame(&payload(json!({"temperature": 20})));
        entity.on_frame(&payload(json!({"humidity": 55})));

        assert_eq!(snapshots.try_recv().unwrap().state, Some(json!(20)));
        assert_eq!(snapshots.try_recv().unwrap().state, Some(json!(20)));
        assert!(snapshots.try_recv().is_err());

        entity.on_detach();
        assert!(entity.state().is_none());
    }
}
