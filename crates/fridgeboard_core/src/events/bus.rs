//! In-process event bus.
//!
//! # Invariants
//! - Listeners of one topic run in descending priority, insertion order among
//!   equal priorities.
//! - A `once` listener is removed before it runs, so it runs at most once even
//!   under re-entrant emits.
//! - A listener that panics is evicted and logged; the emit continues.
//! - `Propagation::Stop` ends the current emit after that listener.

use crate::events::event::{DashboardEvent, Topic};
use crate::logging::panic_message;
use log::{debug, error, warn};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Listener verdict controlling the rest of an emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Registration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Remove after the first invocation.
    pub once: bool,
    /// Higher runs first.
    pub priority: i32,
    /// Label reported in logs, e.g. the owning component.
    pub context: Option<String>,
}

impl ListenerOptions {
    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Identifier returned by `EventBus::on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type ListenerFn = Rc<dyn Fn(&DashboardEvent) -> Propagation>;

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    callback: ListenerFn,
    options: ListenerOptions,
    active: Rc<Cell<bool>>,
}

/// Outcome handle of a deferred emit.
#[derive(Debug, Clone, Default)]
pub struct DeferredEmit {
    handled: Rc<Cell<Option<bool>>>,
}

impl DeferredEmit {
    /// `None` until the deferred queue is flushed; then whether any listener
    /// handled the event.
    pub fn result(&self) -> Option<bool> {
        self.handled.get()
    }

    pub fn is_settled(&self) -> bool {
        self.handled.get().is_some()
    }
}

/// Topic-keyed publish/subscribe bus.
#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    listeners: RefCell<BTreeMap<Topic, Vec<ListenerEntry>>>,
    deferred: RefCell<VecDeque<(DashboardEvent, DeferredEmit)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with default options.
    pub fn on(
        &self,
        topic: impl Into<Topic>,
        listener: impl Fn(&DashboardEvent) + 'static,
    ) -> ListenerId {
        self.on_with(topic, ListenerOptions::default(), move |event| {
            listener(event);
            Propagation::Continue
        })
    }

    /// Registers a listener that runs at most once.
    pub fn once(
        &self,
        topic: impl Into<Topic>,
        listener: impl Fn(&DashboardEvent) + 'static,
    ) -> ListenerId {
        self.on_with(topic, ListenerOptions::once(), move |event| {
            listener(event);
            Propagation::Continue
        })
    }

    /// Registers a listener with explicit options and propagation control.
    pub fn on_with(
        &self,
        topic: impl Into<Topic>,
        options: ListenerOptions,
        listener: impl Fn(&DashboardEvent) -> Propagation + 'static,
    ) -> ListenerId {
        let topic = topic.into();
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let entry = ListenerEntry {
            id,
            callback: Rc::new(listener),
            options,
            active: Rc::new(Cell::new(true)),
        };
        let mut listeners = self.listeners.borrow_mut();
        let list = listeners.entry(topic.clone()).or_default();
        let index = list
            .iter()
            .position(|existing| existing.options.priority < entry.options.priority)
            .unwrap_or(list.len());
        list.insert(index, entry);

        debug!(
            "event=listener_add module=events status=ok topic={} id={}",
            topic, id.0
        );
        id
    }

    /// Removes one listener. Returns `false` when it was not registered.
    pub fn off(&self, topic: impl Into<Topic>, id: ListenerId) -> bool {
        self.remove(&topic.into(), id)
    }

    /// Removes every listener of `topic`; returns how many were removed.
    pub fn off_all(&self, topic: impl Into<Topic>) -> usize {
        let removed = self.listeners.borrow_mut().remove(&topic.into());
        removed.map_or(0, |list| {
            for entry in &list {
                entry.active.set(false);
            }
            list.len()
        })
    }

    pub fn listener_count(&self, topic: impl Into<Topic>) -> usize {
        self.listeners
            .borrow()
            .get(&topic.into())
            .map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, topic: impl Into<Topic>) -> bool {
        self.listener_count(topic) > 0
    }

    /// Topics with at least one listener.
    pub fn topics(&self) -> Vec<Topic> {
        self.listeners.borrow().keys().cloned().collect()
    }

    /// Delivers `event` synchronously.
    ///
    /// Returns whether at least one listener ran to completion.
    pub fn emit(&self, event: &DashboardEvent) -> bool {
        let topic = event.topic();
        let snapshot = match self.listeners.borrow().get(&topic) {
            Some(list) => list.clone(),
            None => return false,
        };

        let mut handled = false;
        for entry in snapshot {
            if !entry.active.get() {
                continue;
            }
            if entry.options.once {
                self.remove(&topic, entry.id);
            }

            let callback = Rc::clone(&entry.callback);
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(verdict) => {
                    handled = true;
                    if verdict == Propagation::Stop {
                        debug!(
                            "event=emit_stopped module=events status=ok topic={} id={}",
                            topic, entry.id.0
                        );
                        break;
                    }
                }
                Err(payload) => {
                    self.remove(&topic, entry.id);
                    error!(
                        "event=listener_failed module=events status=error topic={} id={} context={} panic={}",
                        topic,
                        entry.id.0,
                        entry.options.context.as_deref().unwrap_or("-"),
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        handled
    }

    /// Queues `event` for the next `flush_deferred`.
    pub fn emit_deferred(&self, event: DashboardEvent) -> DeferredEmit {
        let outcome = DeferredEmit::default();
        self.deferred
            .borrow_mut()
            .push_back((event, outcome.clone()));
        outcome
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.borrow().len()
    }

    /// Emits every queued event, including ones queued while flushing.
    ///
    /// Returns the number of events delivered.
    pub fn flush_deferred(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            let Some((event, outcome)) = next else {
                break;
            };
            let handled = self.emit(&event);
            if !handled {
                warn!(
                    "event=deferred_unhandled module=events status=ok topic={}",
                    event.topic()
                );
            }
            outcome.handled.set(Some(handled));
            delivered += 1;
        }
        delivered
    }

    /// Returns a view that prefixes names with `<prefix>:`.
    pub fn namespace(&self, prefix: impl Into<String>) -> Namespace<'_> {
        Namespace {
            bus: self,
            prefix: prefix.into(),
        }
    }

    fn remove(&self, topic: &Topic, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(topic) else {
            return false;
        };
        let Some(index) = list.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = list.remove(index);
        entry.active.set(false);
        if list.is_empty() {
            listeners.remove(topic);
        }
        true
    }
}

/// Name-prefixing view over an `EventBus`.
///
/// Only a naming convenience: listeners registered on the full prefixed name
/// directly on the bus receive namespaced emits and vice versa.
pub struct Namespace<'bus> {
    bus: &'bus EventBus,
    prefix: String,
}

impl Namespace<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full topic for `name` inside this namespace.
    pub fn topic(&self, name: &str) -> Topic {
        Topic::from(format!("{}:{}", self.prefix, name))
    }

    pub fn on(&self, name: &str, listener: impl Fn(&DashboardEvent) + 'static) -> ListenerId {
        self.bus.on(self.topic(name), listener)
    }

    pub fn on_with(
        &self,
        name: &str,
        options: ListenerOptions,
        listener: impl Fn(&DashboardEvent) -> Propagation + 'static,
    ) -> ListenerId {
        self.bus.on_with(self.topic(name), options, listener)
    }

    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        self.bus.off(self.topic(name), id)
    }

    /// Emits a `Custom` event named `<prefix>:<name>`.
    pub fn emit(&self, name: &str, payload: serde_json::Value) -> bool {
        let event = DashboardEvent::custom(format!("{}:{}", self.prefix, name), payload);
        self.bus.emit(&event)
    }
}
