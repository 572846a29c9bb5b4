//! Dashboard state fields and snapshot.
//!
//! # Responsibility
//! - Define the closed set of store fields and their typed values.
//! - Provide the whole-state snapshot used by persistence and `Store::snapshot`.
//!
//! # Invariants
//! - Every `StateValue` variant maps to exactly one `StateKey`.
//! - `next_task_id` is greater than every `task_<n>` id in `tasks`.

use crate::config::DashboardConfig;
use crate::model::task::Task;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Medication name -> taken today.
pub type MedicationStatus = BTreeMap<String, bool>;

/// Store field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKey {
    Tasks,
    CurrentUser,
    WaterCount,
    Medication,
    NextTaskId,
}

impl StateKey {
    pub const ALL: [StateKey; 5] = [
        StateKey::Tasks,
        StateKey::CurrentUser,
        StateKey::WaterCount,
        StateKey::Medication,
        StateKey::NextTaskId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::CurrentUser => "current_user",
            Self::WaterCount => "water_count",
            Self::Medication => "medication",
            Self::NextTaskId => "next_task_id",
        }
    }
}

impl Display for StateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value of one store field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Tasks(Vec<Task>),
    CurrentUser(String),
    WaterCount(u32),
    Medication(MedicationStatus),
    NextTaskId(u64),
}

impl StateValue {
    pub fn key(&self) -> StateKey {
        match self {
            Self::Tasks(_) => StateKey::Tasks,
            Self::CurrentUser(_) => StateKey::CurrentUser,
            Self::WaterCount(_) => StateKey::WaterCount,
            Self::Medication(_) => StateKey::Medication,
            Self::NextTaskId(_) => StateKey::NextTaskId,
        }
    }
}

/// Whole dashboard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub tasks: Vec<Task>,
    pub current_user: String,
    pub water_count: u32,
    pub medication: MedicationStatus,
    pub next_task_id: u64,
}

impl DashboardState {
    /// Empty state for a fresh household.
    pub fn initial(config: &DashboardConfig) -> Self {
        Self {
            tasks: Vec::new(),
            current_user: config.default_user.clone(),
            water_count: 0,
            medication: MedicationStatus::new(),
            next_task_id: 1,
        }
    }

    /// Returns a copy of one field.
    pub fn get(&self, key: StateKey) -> StateValue {
        match key {
            StateKey::Tasks => StateValue::Tasks(self.tasks.clone()),
            StateKey::CurrentUser => StateValue::CurrentUser(self.current_user.clone()),
            StateKey::WaterCount => StateValue::WaterCount(self.water_count),
            StateKey::Medication => StateValue::Medication(self.medication.clone()),
            StateKey::NextTaskId => StateValue::NextTaskId(self.next_task_id),
        }
    }

    /// Returns whether `value` equals the current value of its field.
    pub fn holds(&self, value: &StateValue) -> bool {
        match value {
            StateValue::Tasks(tasks) => self.tasks == *tasks,
            StateValue::CurrentUser(user) => self.current_user == *user,
            StateValue::WaterCount(count) => self.water_count == *count,
            StateValue::Medication(status) => self.medication == *status,
            StateValue::NextTaskId(next) => self.next_task_id == *next,
        }
    }

    /// Replaces one field wholesale and returns the prior value.
    pub fn replace(&mut self, value: StateValue) -> StateValue {
        match value {
            StateValue::Tasks(tasks) => StateValue::Tasks(std::mem::replace(&mut self.tasks, tasks)),
            StateValue::CurrentUser(user) => {
                StateValue::CurrentUser(std::mem::replace(&mut self.current_user, user))
            }
            StateValue::WaterCount(count) => {
                StateValue::WaterCount(std::mem::replace(&mut self.water_count, count))
            }
            StateValue::Medication(status) => {
                StateValue::Medication(std::mem::replace(&mut self.medication, status))
            }
            StateValue::NextTaskId(next) => {
                StateValue::NextTaskId(std::mem::replace(&mut self.next_task_id, next))
            }
        }
    }

    /// Splits the snapshot into one value per field, in `StateKey::ALL` order.
    pub fn into_values(self) -> Vec<StateValue> {
        vec![
            StateValue::Tasks(self.tasks),
            StateValue::CurrentUser(self.current_user),
            StateValue::WaterCount(self.water_count),
            StateValue::Medication(self.medication),
            StateValue::NextTaskId(self.next_task_id),
        ]
    }

    /// Smallest counter value that exceeds every allocated task id.
    pub fn min_next_task_id(tasks: &[Task]) -> u64 {
        tasks
            .iter()
            .filter_map(Task::sequence_number)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }
}
