//! Cross-component signaling.
//!
//! # Responsibility
//! - Define the closed set of dashboard events with typed payloads.
//! - Dispatch events to listeners keyed by topic.
//!
//! Separate from the store: store subscribers observe state, bus listeners
//! observe things that happened (a goal reached, a save failed).

mod bus;
mod event;

pub use bus::{DeferredEmit, EventBus, ListenerId, ListenerOptions, Namespace, Propagation};
pub use event::{DashboardEvent, EventKind, Topic};
