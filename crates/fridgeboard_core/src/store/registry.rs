//! Subscription registry for store fields.
//!
//! # Invariants
//! - Subscribers of one key are kept in insertion order.
//! - A removed entry's `active` flag is cleared before it leaves the registry,
//!   so an in-flight notification pass skips it.

use crate::model::state::{StateKey, StateValue};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// What a subscriber listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubscriptionKey {
    /// One store field.
    Field(StateKey),
    /// Every field change.
    AnyChange,
}

impl From<StateKey> for SubscriptionKey {
    fn from(value: StateKey) -> Self {
        Self::Field(value)
    }
}

/// Payload delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub key: StateKey,
    pub value: StateValue,
    pub old_value: StateValue,
}

pub(crate) type SubscriberFn = Rc<dyn Fn(&StateChange)>;

struct SubscriberEntry {
    id: u64,
    callback: SubscriberFn,
    active: Rc<Cell<bool>>,
}

/// Callback resolved for one notification, with its liveness flag.
pub(crate) struct ResolvedSubscriber {
    pub(crate) id: u64,
    pub(crate) callback: SubscriberFn,
    pub(crate) active: Rc<Cell<bool>>,
}

#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    next_id: u64,
    entries: BTreeMap<SubscriptionKey, Vec<SubscriberEntry>>,
}

impl SubscriptionRegistry {
    pub(crate) fn add(&mut self, key: SubscriptionKey, callback: SubscriberFn) -> (u64, Rc<Cell<bool>>) {
        self.next_id += 1;
        let id = self.next_id;
        let active = Rc::new(Cell::new(true));
        self.entries.entry(key).or_default().push(SubscriberEntry {
            id,
            callback,
            active: Rc::clone(&active),
        });
        (id, active)
    }

    pub(crate) fn remove(&mut self, key: SubscriptionKey, id: u64) -> bool {
        let Some(list) = self.entries.get_mut(&key) else {
            return false;
        };
        let Some(index) = list.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = list.remove(index);
        entry.active.set(false);
        if list.is_empty() {
            self.entries.remove(&key);
        }
        true
    }

    /// Field subscribers first, then any-change subscribers.
    pub(crate) fn resolve(&self, key: StateKey) -> Vec<ResolvedSubscriber> {
        [SubscriptionKey::Field(key), SubscriptionKey::AnyChange]
            .iter()
            .filter_map(|lookup| self.entries.get(lookup))
            .flatten()
            .map(|entry| ResolvedSubscriber {
                id: entry.id,
                callback: Rc::clone(&entry.callback),
                active: Rc::clone(&entry.active),
            })
            .collect()
    }

    pub(crate) fn count(&self, key: SubscriptionKey) -> usize {
        self.entries.get(&key).map_or(0, Vec::len)
    }
}

/// Handle returned by `Store::subscribe`.
///
/// Dropping the handle keeps the subscription alive; call `unsubscribe` to end
/// it. Unsubscribing twice is a no-op.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    key: SubscriptionKey,
    id: u64,
    active: Rc<Cell<bool>>,
    registry: Weak<RefCell<SubscriptionRegistry>>,
}

impl Subscription {
    pub(crate) fn new(
        key: SubscriptionKey,
        id: u64,
        active: Rc<Cell<bool>>,
        registry: Weak<RefCell<SubscriptionRegistry>>,
    ) -> Self {
        Self {
            key,
            id,
            active,
            registry,
        }
    }

    pub fn key(&self) -> SubscriptionKey {
        self.key
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Stops further notifications for this subscriber.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(self.key, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("active", &self.active.get())
            .finish()
    }
}
