// ── Stats subscription hub ──
//
// Registry of per-device callbacks owned by the gateway side. Frames are
// delivered serially per call to `notify`; callbacks are cloned out of
// the map before invocation so no shard lock is held while entity code
// runs (an entity may detach from inside its own callback).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::entity::Entity;
use crate::model::Payload;

/// Callback invoked with every frame delivered under a key.
pub type Callback = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Handle returned by [`StatsSubscriptionHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// Map from device key to the observers attached under it.
pub struct StatsSubscriptionHub {
    subscribers: DashMap<String, Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl StatsSubscriptionHub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback under a device key.
    pub fn subscribe(&self, key: impl Into<String>, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .entry(key.into())
            .or_default()
            .push(Subscriber { id, callback });
        id
    }

    /// Remove a callback. Returns `false` when it was not registered, so
    /// repeated calls are harmless.
    pub fn unsubscribe(&self, key: &str, id: SubscriptionId) -> bool {
        let removed = self
            .subscribers
            .get_mut(key)
            .is_some_and(|mut list| {
                let before = list.len();
                list.retain(|s| s.id != id);
                list.len() != before
            });
        self.subscribers.remove_if(key, |_, list| list.is_empty());
        removed
    }

    /// Deliver one frame to every callback registered under `key`.
    /// Returns how many callbacks ran.
    pub fn notify(&self, key: &str, payload: &Payload) -> usize {
        let callbacks: Vec<Callback> = match self.subscribers.get(key) {
            Some(list) => list.iter().map(|s| Arc::clone(&s.callback)).collect(),
            None => {
                trace!(key, "no subscribers for frame");
                return 0;
            }
        };

        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.subscribers.get(key).map_or(0, |list| list.len())
    }

    /// Keys with at least one subscriber.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.subscribers.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Attach an entity under its subscription key.
    ///
    /// The returned [`Attachment`] detaches on drop.
    pub fn attach(hub: &Arc<Self>, entity: Arc<dyn Entity>) -> Attachment {
        let live = Arc::new(AtomicBool::new(true));
        let key = entity.subscription_key().to_owned();

        entity.on_attach();

        let callback: Callback = {
            let entity = Arc::clone(&entity);
            let live = Arc::clone(&live);
            Arc::new(move |payload: &Payload| {
                // A frame already in flight when the entity detached
                if live.load(Ordering::Acquire) {
                    entity.on_frame(payload);
                }
            })
        };
        let id = hub.subscribe(key.clone(), callback);
        debug!(key = %key, entity = entity.entity_id(), "entity attached");

        Attachment {
            hub: Arc::clone(hub),
            key,
            id,
            entity,
            live,
        }
    }
}

impl Default for StatsSubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}

// ── Attachment ──────────────────────────────────────────────────────

/// An entity's registration with the hub.
pub struct Attachment {
    hub: Arc<StatsSubscriptionHub>,
    key: String,
    id: SubscriptionId,
    entity: Arc<dyn Entity>,
    live: Arc<AtomicBool>,
}

impl Attachment {
    pub fn entity_id(&self) -> &str {
        self.entity.entity_id()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_attached(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stop delivery to the entity. Idempotent.
    pub fn detach(&self) {
        if !self.live.swap(false, Ordering::AcqRel) {
            return;
        }
        self.hub.unsubscribe(&self.key, self.id);
        self.entity.on_detach();
        debug!(key = %self.key, entity = self.entity.entity_id(), "entity detached");
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("entity", &self.entity.entity_id())
            .field("live", &self.is_attached())
            .finish()
    }
}
