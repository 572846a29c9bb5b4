//! Observable key/value store for dashboard state.
//!
//! # Responsibility
//! - Hold the current `DashboardState` and replace fields wholesale.
//! - Notify field and any-change subscribers synchronously after a change.
//! - Keep a bounded history of changes for diagnostics.
//!
//! # Invariants
//! - Setting a value equal to the current one records and notifies nothing.
//! - Notification follows subscription insertion order, field subscribers
//!   before any-change subscribers.
//! - A panicking subscriber is logged and skipped; the write still succeeds
//!   and remaining subscribers still run.
//! - No interior borrow is held while a subscriber runs, so subscribers may
//!   read and write the store.

mod history;
mod registry;

pub use history::{ChangeHistory, ChangeRecord};
pub use registry::{StateChange, Subscription, SubscriptionKey};

use crate::clock::{Clock, SystemClock};
use crate::config::DashboardConfig;
use crate::logging::panic_message;
use crate::model::state::{DashboardState, MedicationStatus, StateKey, StateValue};
use crate::model::task::Task;
use log::{debug, error};
use registry::SubscriptionRegistry;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Single-threaded reactive state holder.
pub struct Store {
    state: RefCell<DashboardState>,
    initial: DashboardState,
    registry: Rc<RefCell<SubscriptionRegistry>>,
    history: RefCell<ChangeHistory>,
    clock: Rc<dyn Clock>,
}

impl Store {
    /// Creates a store holding the initial state for `config`.
    pub fn new(config: &DashboardConfig) -> Self {
        Self::with_clock(config, Rc::new(SystemClock))
    }

    /// Creates a store whose history timestamps come from `clock`.
    pub fn with_clock(config: &DashboardConfig, clock: Rc<dyn Clock>) -> Self {
        let initial = DashboardState::initial(config);
        Self {
            state: RefCell::new(initial.clone()),
            initial,
            registry: Rc::new(RefCell::new(SubscriptionRegistry::default())),
            history: RefCell::new(ChangeHistory::new(config.history_limit)),
            clock,
        }
    }

    /// Returns a copy of one field.
    pub fn get(&self, key: StateKey) -> StateValue {
        self.state.borrow().get(key)
    }

    /// Returns a copy of the whole state.
    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Runs `f` against the current state without cloning it.
    ///
    /// `f` must not write to the store.
    pub fn with_state<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn current_user(&self) -> String {
        self.state.borrow().current_user.clone()
    }

    pub fn water_count(&self) -> u32 {
        self.state.borrow().water_count
    }

    pub fn medication(&self) -> MedicationStatus {
        self.state.borrow().medication.clone()
    }

    pub fn next_task_id(&self) -> u64 {
        self.state.borrow().next_task_id
    }

    /// Replaces one field.
    ///
    /// Returns `false` when the value was unchanged. With `silent`, the change
    /// is recorded in history but no subscriber runs.
    pub fn set(&self, value: StateValue, silent: bool) -> bool {
        let Some(change) = self.apply(value) else {
            return false;
        };
        if !silent {
            self.notify(&[change]);
        }
        true
    }

    /// Replaces several fields, then runs one notification pass.
    ///
    /// Returns how many fields actually changed.
    pub fn update(&self, values: impl IntoIterator<Item = StateValue>, silent: bool) -> usize {
        let changes: Vec<StateChange> = values
            .into_iter()
            .filter_map(|value| self.apply(value))
            .collect();
        if !silent && !changes.is_empty() {
            self.notify(&changes);
        }
        changes.len()
    }

    /// Restores every field to its initial value, notifying subscribers.
    pub fn reset(&self) -> usize {
        self.update(self.initial.clone().into_values(), false)
    }

    /// Registers `callback` for changes of `key` (or of any field).
    pub fn subscribe(
        &self,
        key: impl Into<SubscriptionKey>,
        callback: impl Fn(&StateChange) + 'static,
    ) -> Subscription {
        let key = key.into();
        let (id, active) = self.registry.borrow_mut().add(key, Rc::new(callback));
        debug!("event=store_subscribe module=store status=ok key={key:?} id={id}");
        Subscription::new(key, id, active, Rc::downgrade(&self.registry))
    }

    pub fn subscriber_count(&self, key: impl Into<SubscriptionKey>) -> usize {
        self.registry.borrow().count(key.into())
    }

    /// Recent changes, oldest first.
    pub fn history(&self) -> Vec<ChangeRecord> {
        self.history.borrow().records()
    }

    pub fn clear_history(&self) {
        self.history.borrow_mut().clear();
    }

    fn apply(&self, value: StateValue) -> Option<StateChange> {
        let key = value.key();
        let old_value = {
            let mut state = self.state.borrow_mut();
            if state.holds(&value) {
                return None;
            }
            state.replace(value.clone())
        };

        self.history.borrow_mut().push(ChangeRecord {
            key,
            old_value: old_value.clone(),
            new_value: value.clone(),
            at_ms: self.clock.now_ms(),
        });
        Some(StateChange {
            key,
            value,
            old_value,
        })
    }

    fn notify(&self, changes: &[StateChange]) {
        for change in changes {
            let subscribers = self.registry.borrow().resolve(change.key);
            for subscriber in subscribers {
                if !subscriber.active.get() {
                    continue;
                }
                let callback = subscriber.callback;
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(change))) {
                    error!(
                        "event=subscriber_failed module=store status=error key={} id={} panic={}",
                        change.key,
                        subscriber.id,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
    }
}
