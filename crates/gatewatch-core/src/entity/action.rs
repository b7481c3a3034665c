// ── Action pulse ──
//
// A decoded gesture is published as two transitions: the label, then,
// after `pulse_delay`, an empty label. The reset runs as a spawned task so
// frames for other devices keep flowing while it waits. Every pulse bumps
// a generation counter; a reset only clears the pulse that scheduled it.
// Both writers publish under the state lock, so the last published label
// is always the current one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{Entity, entity_id, lock};
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::gesture;
use crate::model::{Payload, PlatformEvent, StateSnapshot};
use crate::publish::Publisher;

/// Currently published action. `label` is empty between pulses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionState {
    pub label: String,
    pub attributes: Payload,
    pulse: u64,
}

impl ActionState {
    pub fn is_pulsing(&self) -> bool {
        !self.label.is_empty()
    }

    fn snapshot(&self, entity_id: &str) -> StateSnapshot {
        StateSnapshot::new(
            entity_id,
            Some(Value::String(self.label.clone())),
            self.attributes.clone(),
        )
    }
}

/// Edge-triggered action entity for buttons, cubes and vibration sensors.
pub struct ActionEntity {
    entity_id: String,
    key: String,
    pulse_delay: Duration,
    runtime: Handle,
    state: Arc<Mutex<Option<ActionState>>>,
    cancel: Mutex<CancellationToken>,
    publisher: Arc<dyn Publisher>,
}

impl ActionEntity {
    /// Must be called from within a Tokio runtime; the handle is kept for
    /// scheduling resets from delivery threads outside it.
    pub fn new(
        key: &str,
        config: &CoreConfig,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, CoreError> {
        let entity_id = entity_id(key, "action");
        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime {
            entity_id: entity_id.clone(),
        })?;

        Ok(Self {
            entity_id,
            key: key.to_owned(),
            pulse_delay: config.pulse_delay,
            runtime,
            state: Arc::new(Mutex::new(None)),
            cancel: Mutex::new(CancellationToken::new()),
            publisher,
        })
    }

    pub fn state(&self) -> Option<ActionState> {
        lock(&self.state).clone()
    }

    fn schedule_reset(&self, pulse: u64) {
        let token = lock(&self.cancel).clone();
        let state = Arc::clone(&self.state);
        let publisher = Arc::clone(&self.publisher);
        let entity_id = self.entity_id.clone();
        let delay = self.pulse_delay;

        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            let mut guard = lock(&state);
            let Some(current) = guard.as_mut() else {
                return;
            };
            if current.pulse != pulse {
                trace!(entity = %entity_id, pulse, "superseded pulse, skipping reset");
                return;
            }
            current.label.clear();
            publisher.publish(current.snapshot(&entity_id));
        });
    }
}

impl Entity for ActionEntity {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn subscription_key(&self) -> &str {
        &self.key
    }

    fn on_frame(&self, payload: &Payload) {
        let decoded = gesture::decode(payload);

        let (label, pulse) = {
            let mut guard = lock(&self.state);
            let Some(state) = guard.as_mut() else {
                return;
            };
            let pulse = decoded.map(|action| {
                state.label = action.label;
                state.attributes = action.attributes;
                state.pulse = state.pulse.wrapping_add(1);
                state.pulse
            });
            self.publisher.publish(state.snapshot(&self.entity_id));
            (state.label.clone(), pulse)
        };

        if let Some(pulse) = pulse {
            debug!(key = %self.key, action = %label, "action decoded");
            self.publisher.fire(PlatformEvent::Click {
                entity_id: self.entity_id.clone(),
                click_type: label,
            });
            self.schedule_reset(pulse);
        }
    }

    fn on_attach(&self) {
        {
            let mut token = lock(&self.cancel);
            if token.is_cancelled() {
                *token = CancellationToken::new();
            }
        }
        let mut guard = lock(&self.state);
        if guard.is_none() {
            *guard = Some(ActionState::default());
        }
    }

    fn on_detach(&self) {
        lock(&self.cancel).cancel();
        *lock(&self.state) = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::time::sleep;

    use super::*;
    use crate::publish::SnapshotBus;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    fn attached(bus: &Arc<SnapshotBus>) -> ActionEntity {
        let entity =
            ActionEntity::new("lumi.158d0001", &CoreConfig::default(), bus.clone()).unwrap();
        entity.on_attach();
        entity
    }

    #[tokio::test(start_paused = true)]
    async fn label_is_visible_then_resets() {
        let bus = Arc::new(SnapshotBus::new());
        let mut events = bus.subscribe_events();
        let entity = attached(&bus);

        entity.on_frame(&payload(json!({"button": 2})));
        assert_eq!(entity.state().unwrap().label, "double");
        assert_eq!(bus.latest(entity.entity_id()).unwrap().state, Some(json!("double")));

        sleep(Duration::from_millis(50)).await;
        assert!(entity.state().unwrap().is_pulsing());

        sleep(Duration::from_millis(100)).await;
        let state = entity.state().unwrap();
        assert_eq!(state.label, "");
        assert_eq!(state.attributes.get("action"), Some(&json!("double")));
        assert_eq!(bus.latest(entity.entity_id()).unwrap().state, Some(json!("")));

        let event = events.try_recv().unwrap();
        assert_eq!(
            *event,
            PlatformEvent::Click {
                entity_id: "sensor.lumi_158d0001_action".into(),
                click_type: "double".into()
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn frame_without_action_republishes_unchanged() {
        let bus = Arc::new(SnapshotBus::new());
        let mut events = bus.subscribe_events();
        let entity = attached(&bus);

        entity.on_frame(&payload(json!({"button": 1, "battery": 95})));
        assert!(!entity.state().unwrap().is_pulsing());
        assert_eq!(bus.latest(entity.entity_id()).unwrap().state, Some(json!("")));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_pulse_is_not_cut_short() {
        let bus = Arc::new(SnapshotBus::new());
        let entity = attached(&bus);

        entity.on_frame(&payload(json!({"button": 1})));
        sleep(Duration::from_millis(60)).await;
        entity.on_frame(&payload(json!({"button": 2})));

        // First reset fires at 100ms and must leave the second pulse alone
        sleep(Duration::from_millis(60)).await;
        assert_eq!(entity.state().unwrap().label, "double");

        sleep(Duration::from_millis(60)).await;
        assert_eq!(entity.state().unwrap().label, "");
    }

    #[tokio::test(start_paused = true)]
    async fn reset_after_detach_is_a_no_op() {
        let bus = Arc::new(SnapshotBus::new());
        let entity = attached(&bus);

        entity.on_frame(&payload(json!({"vibration": 1})));
        entity.on_detach();
        sleep(Duration::from_millis(200)).await;

        assert!(entity.state().is_none());
        assert_eq!(bus.latest(entity.entity_id()).unwrap().state, Some(json!("vibration")));

        entity.on_attach();
        entity.on_frame(&payload(json!({"tilt_angle": 30})));
        sleep(Duration::from_millis(200)).await;
        assert_eq!(entity.state().unwrap().label, "");
    }

    /// Holds up every non-empty label once `stall` is set.
    struct StallingPublisher {
        inner: SnapshotBus,
        stall: AtomicBool,
    }

    impl Publisher for StallingPublisher {
        fn publish(&self, snapshot: StateSnapshot) {
            if self.stall.load(Ordering::Acquire) && snapshot.state != Some(json!("")) {
                std::thread::sleep(Duration::from_millis(150));
            }
            self.inner.publish(snapshot);
        }

        fn fire(&self, event: PlatformEvent) {
            self.inner.fire(event);
        }
    }

    #[tokio::test]
    async fn slow_republish_cannot_outlive_reset() {
        let publisher = Arc::new(StallingPublisher {
            inner: SnapshotBus::new(),
            stall: AtomicBool::new(false),
        });
        let entity = Arc::new(
            ActionEntity::new("lumi.158d0001", &CoreConfig::default(), publisher.clone()).unwrap(),
        );
        entity.on_attach();

        entity.on_frame(&payload(json!({"button": 1})));
        publisher.stall.store(true, Ordering::Release);
        sleep(Duration::from_millis(90)).await;

        // Delivery thread republishes "single" slowly while the reset comes due
        let delivery = {
            let entity = Arc::clone(&entity);
            std::thread::spawn(move || entity.on_frame(&payload(json!({"temperature": 21}))))
        };
        sleep(Duration::from_millis(300)).await;
        delivery.join().unwrap();

        assert_eq!(entity.state().unwrap().label, "");
        assert_eq!(
            publisher.inner.latest(entity.entity_id()).unwrap().state,
            Some(json!(""))
        );
    }

    #[test]
    fn construction_outside_runtime_fails() {
        let bus = Arc::new(SnapshotBus::new());
        let err = ActionEntity::new("lumi.1", &CoreConfig::default(), bus).err().unwrap();
        assert!(matches!(err, CoreError::NoRuntime { .. }));
    }
}
