//! Use-case services that mutate dashboard state.
//!
//! # Responsibility
//! - Validate input, write the store, then emit the matching bus event.
//! - Keep views decoupled from store layout and event naming.
//!
//! # Invariants
//! - Store writes happen before the event describing them is emitted.
//! - Multi-field changes go through one `Store::update` call.

pub mod health_service;
pub mod task_service;
pub mod user_service;

use crate::clock::Clock;
use crate::config::DashboardConfig;
use crate::events::EventBus;
use crate::store::Store;
use std::rc::Rc;

/// Shared handles every service works against.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Rc<Store>,
    pub bus: Rc<EventBus>,
    pub config: Rc<DashboardConfig>,
    pub clock: Rc<dyn Clock>,
}

#[cfg(test)]
pub(crate) fn test_context() -> ServiceContext {
    use crate::clock::ManualClock;

    let config = DashboardConfig::default();
    let clock: Rc<dyn Clock> = Rc::new(ManualClock::new(1_700_000_000_000));
    ServiceContext {
        store: Rc::new(Store::with_clock(&config, Rc::clone(&clock))),
        bus: Rc::new(EventBus::new()),
        config: Rc::new(config),
        clock,
    }
}
