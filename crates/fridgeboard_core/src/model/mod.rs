//! Dashboard domain model.
//!
//! # Responsibility
//! - Define the task record, the typed store fields and the state snapshot.
//! - Keep shape validation next to the types it guards.
//!
//! # Invariants
//! - Store fields form a closed set (`StateKey`); values are typed.

pub mod health;
pub mod state;
pub mod task;
pub mod validation;
