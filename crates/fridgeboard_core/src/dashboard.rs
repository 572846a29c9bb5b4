//! Dashboard facade wiring store, bus, persistence and services.
//!
//! # Responsibility
//! - Build every component from one validated `DashboardConfig`.
//! - Load persisted state at startup and save it after changes.
//! - Drive timers and deferred events from explicit `tick` calls.
//!
//! # Invariants
//! - Loading writes the store silently; only `state:loaded` announces it.
//! - Every non-silent store change requests a debounced save.
//! - Storage failures never abort the dashboard; state stays in memory and
//!   the failure is reported as `storage:error`.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, DashboardConfig};
use crate::events::{DashboardEvent, EventBus};
use crate::persistence::{
    save_and_report, AutoSave, PersistenceAdapter, PersistenceResult, StorageBackend,
};
use crate::scheduler::Scheduler;
use crate::service::health_service::HealthService;
use crate::service::task_service::TaskService;
use crate::service::user_service::UserService;
use crate::service::ServiceContext;
use crate::store::{Store, Subscription, SubscriptionKey};
use log::{error, info};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// What one `Dashboard::tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub timers_fired: usize,
    pub events_flushed: usize,
}

/// Assembled dashboard over a storage backend `S`.
pub struct Dashboard<S: StorageBackend + 'static> {
    config: Rc<DashboardConfig>,
    store: Rc<Store>,
    bus: Rc<EventBus>,
    scheduler: Scheduler,
    adapter: Rc<PersistenceAdapter<S>>,
    autosave: Rc<AutoSave<S>>,
    autosave_subscription: Subscription,
    tasks: TaskService,
    users: UserService,
    health: HealthService,
}

impl<S: StorageBackend + 'static> Dashboard<S> {
    /// Builds a dashboard using the system clock.
    ///
    /// # Errors
    /// - Any `ConfigError` from `DashboardConfig::validate`.
    pub fn new(storage: S, config: DashboardConfig) -> Result<Self, ConfigError> {
        Self::with_clock(storage, config, Rc::new(SystemClock))
    }

    /// Builds a dashboard whose timestamps come from `clock`.
    pub fn with_clock(
        storage: S,
        config: DashboardConfig,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let store = Rc::new(Store::with_clock(&config, Rc::clone(&clock)));
        let bus = Rc::new(EventBus::new());
        let scheduler = Scheduler::new();
        let adapter = Rc::new(PersistenceAdapter::new(storage, config.clone()));
        let autosave = Rc::new(AutoSave::new(
            Rc::clone(&adapter),
            Rc::clone(&bus),
            scheduler.clone(),
            config.autosave_delay,
        ));

        let autosave_subscription = {
            let weak_store = Rc::downgrade(&store);
            let autosave = Rc::clone(&autosave);
            store.subscribe(SubscriptionKey::AnyChange, move |_| {
                if let Some(store) = weak_store.upgrade() {
                    autosave.request(store.snapshot());
                }
            })
        };

        let config = Rc::new(config);
        let ctx = ServiceContext {
            store: Rc::clone(&store),
            bus: Rc::clone(&bus),
            config: Rc::clone(&config),
            clock,
        };

        Ok(Self {
            config,
            store,
            bus,
            scheduler,
            adapter,
            autosave,
            autosave_subscription,
            tasks: TaskService::new(ctx.clone()),
            users: UserService::new(ctx.clone()),
            health: HealthService::new(ctx),
        })
    }

    /// Loads persisted state into the store and emits `state:loaded`.
    ///
    /// Returns the number of tasks loaded. On error the store keeps its
    /// defaults, `storage:error` is emitted and the dashboard stays usable.
    pub fn bootstrap(&self) -> PersistenceResult<usize> {
        let started_at = Instant::now();
        info!("event=bootstrap module=dashboard status=start");

        let state = match self.adapter.load_all() {
            Ok(state) => state,
            Err(err) => {
                error!(
                    "event=bootstrap module=dashboard status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.bus.emit(&DashboardEvent::StorageError {
                    operation: "load".to_string(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        let tasks = state.tasks.len();
        self.store.update(state.into_values(), true);
        info!(
            "event=bootstrap module=dashboard status=ok duration_ms={} tasks={}",
            started_at.elapsed().as_millis(),
            tasks
        );
        self.bus.emit(&DashboardEvent::StateLoaded { tasks });
        Ok(tasks)
    }

    /// Advances virtual time by `elapsed`, then flushes deferred events.
    pub fn tick(&self, elapsed: Duration) -> TickSummary {
        let timers_fired = self.scheduler.advance(elapsed);
        let events_flushed = self.bus.flush_deferred();
        TickSummary {
            timers_fired,
            events_flushed,
        }
    }

    /// Saves the current state now, replacing any pending debounced save.
    pub fn flush(&self) -> PersistenceResult<usize> {
        self.autosave.cancel();
        save_and_report(&self.adapter, &self.bus, &self.store.snapshot())
    }

    /// Resets the store to defaults and removes every persisted key.
    pub fn clear(&self) -> PersistenceResult<()> {
        self.store.reset();
        self.autosave.cancel();
        if let Err(err) = self.adapter.clear_all() {
            self.bus.emit(&DashboardEvent::StorageError {
                operation: "clear".to_string(),
                message: err.to_string(),
            });
            return Err(err);
        }
        Ok(())
    }

    /// Stops saving automatically after store changes.
    pub fn disable_autosave(&self) {
        self.autosave.cancel();
        self.autosave_subscription.unsubscribe();
    }

    pub fn is_save_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn storage(&self) -> &S {
        self.adapter.storage()
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn health(&self) -> &HealthService {
        &self.health
    }
}

#[cfg(test)]
mod tests {
    use super::Dashboard;
    use crate::config::DashboardConfig;
    use crate::events::EventKind;
    use crate::persistence::{MemoryStorage, StorageBackend};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn dashboard() -> Dashboard<Rc<MemoryStorage>> {
        Dashboard::new(Rc::new(MemoryStorage::new()), DashboardConfig::default())
            .expect("default config is valid")
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = DashboardConfig {
            max_water: 0,
            ..DashboardConfig::default()
        };
        assert!(Dashboard::new(MemoryStorage::new(), config).is_err());
    }

    #[test]
    fn bootstrap_on_empty_storage_emits_state_loaded() {
        let dashboard = dashboard();
        let loaded = Rc::new(Cell::new(false));
        let flag = Rc::clone(&loaded);
        dashboard
            .bus()
            .on(EventKind::StateLoaded, move |_| flag.set(true));

        assert_eq!(dashboard.bootstrap().expect("bootstrap"), 0);
        assert!(loaded.get());
        assert!(!dashboard.is_save_pending());
    }

    #[test]
    fn store_change_saves_after_quiet_period() {
        let dashboard = dashboard();
        dashboard.health().add_water();
        assert!(dashboard.is_save_pending());

        let summary = dashboard.tick(Duration::from_millis(500));
        assert_eq!(summary.timers_fired, 1);
        assert_eq!(
            dashboard
                .storage()
                .get_item("smartFridge_waterCount")
                .expect("read")
                .as_deref(),
            Some("1")
        );
    }

    #[test]
    fn disabled_autosave_writes_nothing() {
        let dashboard = dashboard();
        dashboard.disable_autosave();
        dashboard.health().add_water();
        dashboard.tick(Duration::from_secs(5));
        assert_eq!(dashboard.storage().write_count(), 0);
    }

    #[test]
    fn clear_removes_persisted_keys_and_resets_store() {
        let dashboard = dashboard();
        dashboard.health().add_water();
        dashboard.flush().expect("flush");
        dashboard.clear().expect("clear");

        assert_eq!(dashboard.store().water_count(), 0);
        assert!(dashboard.storage().keys().expect("keys").is_empty());
        assert!(!dashboard.is_save_pending());
    }
}
