//! Debounced snapshot saving.
//!
//! # Invariants
//! - At most one save is pending; a newer request replaces the older snapshot
//!   and restarts the quiet window (last write wins).
//! - Save failures are logged and reported as `storage:error` events; they
//!   never reach the caller that requested the save.

use crate::events::{DashboardEvent, EventBus};
use crate::model::state::DashboardState;
use crate::persistence::adapter::{PersistenceAdapter, PersistenceResult};
use crate::persistence::storage::StorageBackend;
use crate::scheduler::{Debouncer, Scheduler};
use log::{debug, error, info};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Trailing-edge debounced wrapper around `PersistenceAdapter::save_all`.
pub struct AutoSave<S: StorageBackend + 'static> {
    adapter: Rc<PersistenceAdapter<S>>,
    bus: Rc<EventBus>,
    debouncer: Debouncer,
    latest: Rc<RefCell<Option<DashboardState>>>,
}

impl<S: StorageBackend + 'static> AutoSave<S> {
    pub fn new(
        adapter: Rc<PersistenceAdapter<S>>,
        bus: Rc<EventBus>,
        scheduler: Scheduler,
        delay: Duration,
    ) -> Self {
        Self {
            adapter,
            bus,
            debouncer: Debouncer::new(scheduler, delay),
            latest: Rc::new(RefCell::new(None)),
        }
    }

    /// Schedules `state` to be saved once the quiet window elapses.
    pub fn request(&self, state: DashboardState) {
        *self.latest.borrow_mut() = Some(state);

        let adapter = Rc::clone(&self.adapter);
        let bus = Rc::clone(&self.bus);
        let latest = Rc::clone(&self.latest);
        self.debouncer.call(move || {
            let pending = latest.borrow_mut().take();
            if let Some(state) = pending {
                if let Err(err) = save_and_report(&adapter, &bus, &state) {
                    debug!("event=autosave module=persistence status=reported error={err}");
                }
            }
        });
    }

    /// Writes the pending snapshot now. Returns `false` when nothing was pending.
    pub fn flush(&self) -> bool {
        self.debouncer.flush()
    }

    /// Drops the pending snapshot without writing it.
    pub fn cancel(&self) -> bool {
        self.latest.borrow_mut().take();
        self.debouncer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

/// Saves `state` and reports the outcome on `bus`.
pub fn save_and_report<S: StorageBackend>(
    adapter: &PersistenceAdapter<S>,
    bus: &EventBus,
    state: &DashboardState,
) -> PersistenceResult<usize> {
    match adapter.save_all(state) {
        Ok(keys_written) => {
            info!("event=state_save module=persistence status=ok keys_written={keys_written}");
            bus.emit(&DashboardEvent::StorageSaved { keys_written });
            Ok(keys_written)
        }
        Err(err) => {
            error!("event=state_save module=persistence status=error error={err}");
            bus.emit(&DashboardEvent::StorageError {
                operation: "save".to_string(),
                message: err.to_string(),
            });
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AutoSave;
    use crate::config::DashboardConfig;
    use crate::events::{EventBus, EventKind};
    use crate::model::state::DashboardState;
    use crate::persistence::adapter::PersistenceAdapter;
    use crate::persistence::storage::{MemoryStorage, StorageBackend};
    use crate::scheduler::Scheduler;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn fixture() -> (Rc<PersistenceAdapter<Rc<MemoryStorage>>>, Rc<MemoryStorage>, Rc<EventBus>, Scheduler) {
        let storage = Rc::new(MemoryStorage::new());
        let adapter = Rc::new(PersistenceAdapter::new(
            Rc::clone(&storage),
            DashboardConfig::default(),
        ));
        (adapter, storage, Rc::new(EventBus::new()), Scheduler::new())
    }

    fn state_with_water(count: u32) -> DashboardState {
        let mut state = DashboardState::initial(&DashboardConfig::default());
        state.water_count = count;
        state
    }

    #[test]
    fn rapid_requests_collapse_into_one_save_of_last_state() {
        let (adapter, storage, bus, scheduler) = fixture();
        let autosave = AutoSave::new(adapter, bus, scheduler.clone(), Duration::from_millis(500));

        for count in 1..=5 {
            autosave.request(state_with_water(count));
            scheduler.advance(Duration::from_millis(100));
        }
        assert_eq!(storage.write_count(), 0);

        scheduler.advance(Duration::from_millis(500));
        assert_eq!(storage.write_count(), 4);
        assert_eq!(
            storage
                .get_item("smartFridge_waterCount")
                .expect("read")
                .as_deref(),
            Some("5")
        );
    }

    #[test]
    fn failed_save_is_reported_as_storage_error() {
        let (adapter, storage, bus, scheduler) = fixture();
        let errors = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&errors);
        bus.on(EventKind::StorageError, move |_| *counter.borrow_mut() += 1);
        let autosave = AutoSave::new(adapter, Rc::clone(&bus), scheduler, Duration::from_millis(10));

        storage.set_available(false);
        autosave.request(state_with_water(1));
        assert!(autosave.flush());
        assert_eq!(*errors.borrow(), 1);
        assert!(!autosave.is_pending());
    }

    #[test]
    fn cancel_drops_pending_snapshot() {
        let (adapter, storage, bus, scheduler) = fixture();
        let autosave = AutoSave::new(adapter, bus, scheduler.clone(), Duration::from_millis(10));
        autosave.request(state_with_water(2));
        assert!(autosave.cancel());
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(storage.write_count(), 0);
    }
}
