//! Core state logic for the Fridgeboard household dashboard.
//! This crate is the single source of truth for dashboard invariants.

pub mod clock;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod scheduler;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DashboardConfig};
pub use dashboard::{Dashboard, TickSummary};
pub use events::{DashboardEvent, EventBus, EventKind, ListenerOptions, Propagation, Topic};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::state::{DashboardState, MedicationStatus, StateKey, StateValue};
pub use model::task::{Task, TaskId, TaskPriority, TaskValidationError};
pub use model::validation::{ValidationReport, ValidationWarning};
pub use persistence::{
    MemoryStorage, PersistenceAdapter, PersistenceError, SqliteStorage, StorageBackend,
    StorageError,
};
pub use scheduler::{Debouncer, Scheduler, TimerId};
pub use service::health_service::{HealthService, HealthServiceError, WaterProgress};
pub use service::task_service::{NewTask, TaskEdit, TaskService, TaskServiceError, TaskStats};
pub use service::user_service::{UserService, UserServiceError};
pub use store::{StateChange, Store, Subscription, SubscriptionKey};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
