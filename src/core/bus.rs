//! # Event Bus
//!
//! Topic-based publish/subscribe. This is the only channel between
//! background work (expanders, the operation tracker) and the display.
//!
//! ```text
//!   Navigator ──┐                      ┌──► Subscription (status bar)
//!   Tracker  ───┼──► EventBus::publish ┼──► Subscription (history tracker)
//!   Expanders ──┘     (never blocks)   └──► ...
//! ```
//!
//! Every subscriber owns a bounded inbox of [`SUBSCRIBER_CAPACITY`] events.
//! When an inbox is full the event is dropped for that subscriber only and
//! counted. Delivery is at-most-once and publishers never see back-pressure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use log::{debug, trace};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::core::node::TreeNode;
use crate::core::status::StatusEvent;

/// Inbox size for every subscriber.
pub const SUBSCRIBER_CAPACITY: usize = 30;

/// `PreNavigate` payload used when the transition is a back-navigation.
pub const GO_BACK_ID: &str = "GOBACK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Progress and result messages ([`StatusEvent`]).
    Status,
    /// Published before the view changes. Carries the target node ID or [`GO_BACK_ID`].
    PreNavigate,
    /// Published after a navigation attempt, successful or not.
    Navigated,
}

/// Payload of the `Navigated` topic.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatedEvent {
    pub success: bool,
    pub is_back: bool,
    /// ID of the node whose children are now displayed.
    pub parent_id: Option<String>,
    pub nodes: Vec<TreeNode>,
}

impl NavigatedEvent {
    pub fn failure(is_back: bool, parent_id: Option<String>) -> Self {
        Self {
            success: false,
            is_back,
            parent_id,
            nodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Status(StatusEvent),
    PreNavigate(String),
    Navigated(NavigatedEvent),
}

impl BusEvent {
    /// The topic an event is delivered on, fixed by its variant.
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::Status(_) => Topic::Status,
            BusEvent::PreNavigate(_) => Topic::PreNavigate,
            BusEvent::Navigated(_) => Topic::Navigated,
        }
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<BusEvent>,
    dropped: Arc<AtomicU64>,
}

#[derive(Default)]
struct Registry {
    topics: RwLock<HashMap<Topic, Vec<Subscriber>>>,
    next_id: AtomicU64,
    dropped: AtomicU64,
}

impl Registry {
    fn remove(&self, topic: Topic, ids: &[u64]) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(subscribers) = topics.get_mut(&topic) {
            subscribers.retain(|s| !ids.contains(&s.id));
            if subscribers.is_empty() {
                topics.remove(&topic);
            }
        }
    }
}

/// Shared handle to one bus instance. Cloning is cheap and every clone
/// publishes into the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every current subscriber of its topic without blocking.
    pub fn publish(&self, event: BusEvent) {
        let topic = event.topic();
        let mut closed = Vec::new();
        {
            let topics = self
                .registry
                .topics
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(subscribers) = topics.get(&topic) else {
                trace!("No subscribers for {:?}, event discarded", topic);
                return;
            };
            for subscriber in subscribers {
                match subscriber.tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        subscriber.dropped.fetch_add(1, Ordering::Relaxed);
                        self.registry.dropped.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            "Inbox full for subscriber {} on {:?}, event dropped",
                            subscriber.id, topic
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(subscriber.id),
                }
            }
        }
        if !closed.is_empty() {
            debug!("Pruning {} closed subscriber(s) on {:?}", closed.len(), topic);
            self.registry.remove(topic, &closed);
        }
    }

    /// Creates a new inbox receiving every later event on `topic`, in publish order.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let dropped = Arc::new(AtomicU64::new(0));
        self.registry
            .topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .push(Subscriber {
                id,
                tx,
                dropped: dropped.clone(),
            });
        debug!("Subscriber {} attached to {:?}", id, topic);
        Subscription {
            id,
            topic,
            rx,
            dropped,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Detaches a subscription. Nothing is delivered to it afterwards.
    /// Same as dropping the [`Subscription`], which is the usual way out.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// Total events dropped on full inboxes since the bus was created.
    pub fn dropped_count(&self) -> u64 {
        self.registry.dropped.load(Ordering::Relaxed)
    }
}

/// One subscriber's inbox. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    topic: Topic,
    rx: mpsc::Receiver<BusEvent>,
    dropped: Arc<AtomicU64>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Waits for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<BusEvent> {
        self.rx.try_recv().ok()
    }

    /// Events dropped for this subscriber because its inbox was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.topic, &[self.id]);
            debug!("Subscriber {} detached from {:?}", self.id, self.topic);
        }
    }
}
