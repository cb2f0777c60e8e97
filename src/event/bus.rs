//! Synchronous publish/subscribe bus.
//!
//! [`EventBus`] only stores subscriptions; it does not call them. The owner
//! of the bus (the context type `C`) snapshots the handlers for a topic with
//! [`EventBus::handlers`], then invokes each one with `&mut C`, checking
//! [`EventBus::is_subscribed`] first so that a handler removed by an earlier
//! handler in the same dispatch is skipped. Handlers are `Rc` so they can be
//! held outside the bus while they run and mutate the context (and the bus).

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use super::topic::Topic;

new_key_type! {
    /// Identifies one subscription.
    pub struct SubscriptionId;
}

/// A subscribed callback.
pub type Handler<C> = Rc<dyn Fn(&mut C)>;

struct Subscription<C> {
    topic: Topic,
    handler: Handler<C>,
}

pub struct EventBus<C> {
    subscriptions: SlotMap<SubscriptionId, Subscription<C>>,
    topics: HashMap<Topic, Vec<SubscriptionId>>,
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self {
            subscriptions: SlotMap::with_key(),
            topics: HashMap::new(),
        }
    }

    /// Register `handler` for `topic`. Handlers run in registration order.
    pub fn subscribe(&mut self, topic: Topic, handler: Handler<C>) -> SubscriptionId {
        let id = self.subscriptions.insert(Subscription {
            topic: topic.clone(),
            handler,
        });
        self.topics.entry(topic).or_default().push(id);
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(sub) = self.subscriptions.remove(id) else {
            return false;
        };
        if let Some(ids) = self.topics.get_mut(&sub.topic) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.topics.remove(&sub.topic);
            }
        }
        true
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(id)
    }

    /// Snapshot of the handlers for `topic`, in registration order.
    pub fn handlers(&self, topic: &Topic) -> Vec<(SubscriptionId, Handler<C>)> {
        self.topics
            .get(topic)
            .map(|ids| {
                ids.iter()
                    .filter_map(|&id| self.subscriptions.get(id).map(|s| (id, Rc::clone(&s.handler))))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    /// Remove every subscription whose topic matches `predicate`. Returns
    /// how many were removed.
    pub fn purge(&mut self, mut predicate: impl FnMut(&Topic) -> bool) -> usize {
        let doomed: Vec<SubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| predicate(&s.topic))
            .map(|(id, _)| id)
            .collect();
        for &id in &doomed {
            self.unsubscribe(id);
        }
        doomed.len()
    }

    /// Total number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.topics.clear();
    }
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("topics", &self.topics.len())
            .finish()
    }
}
