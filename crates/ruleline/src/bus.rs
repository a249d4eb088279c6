//! The shared event bus.
//!
//! One [`EventBus`] is shared by every node in the tree. It is cheap to clone;
//! all clones talk to the same subscriber table and responder.
//!
//! # Delivery
//!
//! Broadcasts are delivered synchronously, in subscription order, to every
//! handler subscribed to the message's topic when its turn comes. A publish
//! made while a delivery pass is running (for example from inside a handler)
//! is queued and delivered after the current message reaches everyone, so
//! publish order is preserved per topic.
//!
//! Each pass iterates over a snapshot of the subscriber list, so handlers may
//! subscribe or release during delivery. A released handler is skipped for
//! the rest of the pass.
//!
//! A panicking handler does not strand the queue: the remaining handlers and
//! queued messages are still delivered, then the first panic resumes on the
//! publishing thread.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::request::{dispatch_request, OrderRuleResponder, PendingReply, DEFAULT_REQUEST_TIMEOUT};
use crate::topic::{Broadcast, BroadcastTopic, OrderRule};

type Handler = Arc<dyn Fn(&Broadcast) + Send + Sync>;

/// Bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Upper bound on how long a `rule.orderRule` request may go unanswered.
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Clone)]
struct Subscriber {
    id: Uuid,
    active: Arc<AtomicBool>,
    handler: Handler,
}

struct BusInner {
    config: BusConfig,
    subscribers: DashMap<BroadcastTopic, Vec<Subscriber>>,
    responder: RwLock<Option<Arc<dyn OrderRuleResponder>>>,
    queue: Mutex<VecDeque<Broadcast>>,
    draining: AtomicBool,
}

/// Process-wide publish/subscribe and request/response channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .field("topics", &self.inner.subscribers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::from_config(BusConfig::default())
    }

    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    pub fn from_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                subscribers: DashMap::new(),
                responder: RwLock::new(None),
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Register `handler` for `topic`. Delivery stops when the returned
    /// [`Subscription`] is released or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, topic: BroadcastTopic, handler: F) -> Subscription
    where
        F: Fn(&Broadcast) + Send + Sync + 'static,
    {
        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            active: Arc::new(AtomicBool::new(true)),
            handler: Arc::new(handler),
        };
        let id = subscriber.id;
        let active = Arc::clone(&subscriber.active);

        self.inner.subscribers.entry(topic).or_default().push(subscriber);
        debug!(%topic, subscription = %id, "subscribed");

        Subscription {
            id,
            topic,
            active,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: BroadcastTopic) -> usize {
        self.inner
            .subscribers
            .get(&topic)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Deliver `message` to every handler subscribed to its topic.
    pub fn publish(&self, message: Broadcast) {
        debug!(topic = %message.topic(), ?message, "publish");
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(message);

        // Whoever holds the draining flag delivers everything queued.
        let mut panicked = None;
        while !self.inner.draining.swap(true, Ordering::AcqRel) {
            let guard = DrainGuard(&self.inner.draining);
            while let Some(next) = self.pop_queued() {
                self.deliver(&next, &mut panicked);
            }
            drop(guard);
            if self.queue_is_empty() {
                break;
            }
        }
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
    }

    /// Install the responder for `rule.orderRule`, replacing any previous one.
    pub fn respond_with(&self, responder: Arc<dyn OrderRuleResponder>) {
        *self
            .inner
            .responder
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(responder);
    }

    /// Issue a `rule.orderRule` request. Returns immediately.
    ///
    /// Must be called from within a Tokio runtime; otherwise the reply
    /// resolves to [`crate::ReorderFailure::NoRuntime`].
    pub fn request(&self, request: OrderRule) -> PendingReply {
        let responder = self
            .inner
            .responder
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        dispatch_request(responder, request, self.inner.config.request_timeout)
    }

    fn pop_queued(&self) -> Option<Broadcast> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn queue_is_empty(&self) -> bool {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn deliver(&self, message: &Broadcast, panicked: &mut Option<Box<dyn Any + Send>>) {
        // Snapshot, then release the shard lock before running handlers.
        let snapshot: SmallVec<[Subscriber; 8]> = match self.inner.subscribers.get(&message.topic()) {
            Some(subs) => subs.iter().cloned().collect(),
            None => return,
        };
        for subscriber in &snapshot {
            if !subscriber.active.load(Ordering::Acquire) {
                continue;
            }
            let handler = &subscriber.handler;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
                warn!(topic = %message.topic(), subscription = %subscriber.id, "handler panicked");
                panicked.get_or_insert(payload);
            }
        }
    }
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builder for [`EventBus`].
#[derive(Debug, Default)]
pub struct EventBusBuilder {
    config: BusConfig,
}

impl EventBusBuilder {
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> EventBus {
        EventBus::from_config(self.config)
    }
}

/// A handler's registration on the bus.
///
/// Released exactly once: explicitly through [`Subscription::release`] or
/// implicitly on drop, whichever comes first.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    topic: BroadcastTopic,
    active: Arc<AtomicBool>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn topic(&self) -> BroadcastTopic {
        self.topic
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn release(self) {
        // Drop does the work.
    }

    fn detach(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            if let Some(mut subs) = bus.subscribers.get_mut(&self.topic) {
                subs.retain(|s| s.id != self.id);
            }
        }
        debug!(topic = %self.topic, subscription = %self.id, "released");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
