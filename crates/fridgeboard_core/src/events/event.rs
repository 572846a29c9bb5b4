//! Typed dashboard events and their topics.

use crate::model::task::{Task, TaskId};
use std::fmt::{Display, Formatter};

/// Cross-component signal.
///
/// Each variant carries its own payload; `Custom` covers free-form signals
/// (e.g. the ones emitted through a namespace).
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    TaskAdded(Task),
    TaskUpdated(Task),
    TaskDeleted { id: TaskId },
    TaskToggled { id: TaskId, completed: bool },
    TasksCleared { owner: Option<String>, removed: usize },
    UserChanged { previous: String, current: String },
    WaterAdded { count: u32, max: u32 },
    WaterRemoved { count: u32, max: u32 },
    WaterReset,
    WaterGoalAchieved { count: u32 },
    MedicationTaken { name: String, taken: bool },
    MedicationReset,
    StorageError { operation: String, message: String },
    StorageSaved { keys_written: usize },
    StateLoaded { tasks: usize },
    Custom { name: String, payload: serde_json::Value },
}

impl DashboardEvent {
    /// Creates a free-form event.
    pub fn custom(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Custom {
            name: name.into(),
            payload,
        }
    }

    /// Topic listeners must register on to receive this event.
    ///
    /// A `Custom` event whose name matches a built-in topic is delivered to
    /// that topic's listeners.
    pub fn topic(&self) -> Topic {
        let kind = match self {
            Self::TaskAdded(_) => EventKind::TaskAdded,
            Self::TaskUpdated(_) => EventKind::TaskUpdated,
            Self::TaskDeleted { .. } => EventKind::TaskDeleted,
            Self::TaskToggled { .. } => EventKind::TaskToggled,
            Self::TasksCleared { .. } => EventKind::TasksCleared,
            Self::UserChanged { .. } => EventKind::UserChanged,
            Self::WaterAdded { .. } => EventKind::WaterAdded,
            Self::WaterRemoved { .. } => EventKind::WaterRemoved,
            Self::WaterReset => EventKind::WaterReset,
            Self::WaterGoalAchieved { .. } => EventKind::WaterGoalAchieved,
            Self::MedicationTaken { .. } => EventKind::MedicationTaken,
            Self::MedicationReset => EventKind::MedicationReset,
            Self::StorageError { .. } => EventKind::StorageError,
            Self::StorageSaved { .. } => EventKind::StorageSaved,
            Self::StateLoaded { .. } => EventKind::StateLoaded,
            Self::Custom { name, .. } => return Topic::from(name.as_str()),
        };
        Topic::Kind(kind)
    }
}

/// Tag of a built-in event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    TaskAdded,
    TaskUpdated,
    TaskDeleted,
    TaskToggled,
    TasksCleared,
    UserChanged,
    WaterAdded,
    WaterRemoved,
    WaterReset,
    WaterGoalAchieved,
    MedicationTaken,
    MedicationReset,
    StorageError,
    StorageSaved,
    StateLoaded,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        EventKind::TaskAdded,
        EventKind::TaskUpdated,
        EventKind::TaskDeleted,
        EventKind::TaskToggled,
        EventKind::TasksCleared,
        EventKind::UserChanged,
        EventKind::WaterAdded,
        EventKind::WaterRemoved,
        EventKind::WaterReset,
        EventKind::WaterGoalAchieved,
        EventKind::MedicationTaken,
        EventKind::MedicationReset,
        EventKind::StorageError,
        EventKind::StorageSaved,
        EventKind::StateLoaded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskAdded => "task:added",
            Self::TaskUpdated => "task:updated",
            Self::TaskDeleted => "task:deleted",
            Self::TaskToggled => "task:toggled",
            Self::TasksCleared => "tasks:cleared",
            Self::UserChanged => "user:changed",
            Self::WaterAdded => "water:added",
            Self::WaterRemoved => "water:removed",
            Self::WaterReset => "water:reset",
            Self::WaterGoalAchieved => "water:goal:achieved",
            Self::MedicationTaken => "medication:taken",
            Self::MedicationReset => "medication:reset",
            Self::StorageError => "storage:error",
            Self::StorageSaved => "storage:saved",
            Self::StateLoaded => "state:loaded",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// Registry key for listeners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Kind(EventKind),
    Custom(String),
}

impl Topic {
    pub fn name(&self) -> &str {
        match self {
            Self::Kind(kind) => kind.as_str(),
            Self::Custom(name) => name.as_str(),
        }
    }
}

impl From<EventKind> for Topic {
    fn from(value: EventKind) -> Self {
        Self::Kind(value)
    }
}

impl From<&str> for Topic {
    fn from(value: &str) -> Self {
        match EventKind::from_name(value) {
            Some(kind) => Self::Kind(kind),
            None => Self::Custom(value.to_string()),
        }
    }
}

impl From<String> for Topic {
    fn from(value: String) -> Self {
        match EventKind::from_name(&value) {
            Some(kind) => Self::Kind(kind),
            None => Self::Custom(value),
        }
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardEvent, EventKind, Topic};
    use serde_json::json;

    #[test]
    fn kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn custom_event_with_builtin_name_maps_to_kind_topic() {
        let event = DashboardEvent::custom("water:goal:achieved", json!({ "count": 8 }));
        assert_eq!(event.topic(), Topic::Kind(EventKind::WaterGoalAchieved));

        let other = DashboardEvent::custom("fridge:door:open", json!(null));
        assert_eq!(other.topic(), Topic::Custom("fridge:door:open".to_string()));
    }
}
