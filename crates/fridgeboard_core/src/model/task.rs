//! Task domain model.
//!
//! # Responsibility
//! - Define the household task record shared by store, services and storage.
//! - Validate record shape before it is written or accepted from storage.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `text` is non-blank and within the configured length limit.
//! - `completed_at` is only set while `completed` is true.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static TASK_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^task_(\d+)$").expect("valid task id regex"));

/// Stable task identifier (`task_<n>` for ids allocated by this crate).
pub type TaskId = String;

/// Optional urgency marker shown next to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One household task.
///
/// Serialized in camelCase with `owner` stored as `user`, matching the shape
/// written to local storage by earlier dashboard builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    /// Household user id owning this task.
    #[serde(rename = "user")]
    pub owner: String,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    /// Unix epoch milliseconds. Set when the task was last completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl Task {
    /// Creates an open task with no optional fields.
    pub fn new(
        id: impl Into<TaskId>,
        text: impl Into<String>,
        owner: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            owner: owner.into(),
            completed: false,
            created_at,
            priority: None,
            description: None,
            due_date: None,
            completed_at: None,
        }
    }

    /// Flips completion and keeps `completed_at` consistent with it.
    pub fn toggle(&mut self, now_ms: i64) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now_ms) } else { None };
    }

    /// Returns whether the task is open and its due date has passed.
    pub fn is_overdue(&self, now_ms: i64) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now_ms)
    }

    /// Numeric part of a `task_<n>` id, if the id has that form.
    pub fn sequence_number(&self) -> Option<u64> {
        task_sequence_number(&self.id)
    }

    /// Checks record shape.
    ///
    /// Owner membership in the household roster is checked by callers that
    /// hold the configuration.
    pub fn validate(&self, max_text_len: usize) -> Result<(), TaskValidationError> {
        if self.id.trim().is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        validate_task_text(&self.text, max_text_len)?;
        if self.owner.trim().is_empty() {
            return Err(TaskValidationError::EmptyOwner);
        }
        if self.sequence_number() == Some(MAX_TASK_SEQUENCE) {
            return Err(TaskValidationError::SequenceExhausted(self.id.clone()));
        }
        if self.completed_at.is_some() && !self.completed {
            return Err(TaskValidationError::CompletedAtWithoutCompletion(
                self.id.clone(),
            ));
        }
        Ok(())
    }
}

/// Largest sequence number; no id may use it so the counter can exceed every id.
pub const MAX_TASK_SEQUENCE: u64 = u64::MAX;

/// Formats a task id from its sequence number.
pub fn format_task_id(sequence: u64) -> TaskId {
    format!("task_{sequence}")
}

/// Parses the numeric part of a `task_<n>` id.
pub fn task_sequence_number(id: &str) -> Option<u64> {
    TASK_ID_RE
        .captures(id)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Checks task text against blank/length rules.
pub fn validate_task_text(text: &str, max_len: usize) -> Result<(), TaskValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyText);
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(TaskValidationError::TextTooLong { len, max: max_len });
    }
    Ok(())
}

/// Task record rejected by shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyId,
    EmptyText,
    TextTooLong { len: usize, max: usize },
    EmptyOwner,
    UnknownOwner(String),
    CompletedAtWithoutCompletion(TaskId),
    DuplicateId(TaskId),
    /// Id uses the last sequence number, leaving the counter nothing above it.
    SequenceExhausted(TaskId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "task id must not be blank"),
            Self::EmptyText => write!(f, "task text must not be blank"),
            Self::TextTooLong { len, max } => {
                write!(f, "task text is {len} chars; maximum is {max}")
            }
            Self::EmptyOwner => write!(f, "task owner must not be blank"),
            Self::UnknownOwner(owner) => write!(f, "unknown task owner: `{owner}`"),
            Self::CompletedAtWithoutCompletion(id) => {
                write!(f, "task {id} has completed_at but is not completed")
            }
            Self::DuplicateId(id) => write!(f, "duplicate task id: {id}"),
            Self::SequenceExhausted(id) => {
                write!(f, "task id {id} leaves no sequence number above it")
            }
        }
    }
}

impl Error for TaskValidationError {}

#[cfg(test)]
mod tests {
    use super::{
        format_task_id, task_sequence_number, Task, TaskValidationError, MAX_TASK_SEQUENCE,
    };

    #[test]
    fn toggle_keeps_completed_at_consistent() {
        let mut task = Task::new("task_1", "buy milk", "mom", 10);
        task.toggle(20);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(20));
        task.toggle(30);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert!(task.validate(500).is_ok());
    }

    #[test]
    fn validate_rejects_blank_and_long_text() {
        let blank = Task::new("task_1", "   ", "mom", 0);
        assert_eq!(blank.validate(500), Err(TaskValidationError::EmptyText));

        let long = Task::new("task_2", "x".repeat(11), "mom", 0);
        assert_eq!(
            long.validate(10),
            Err(TaskValidationError::TextTooLong { len: 11, max: 10 })
        );
    }

    #[test]
    fn sequence_number_parses_allocated_ids_only() {
        assert_eq!(task_sequence_number(&format_task_id(42)), Some(42));
        assert_eq!(task_sequence_number("task_x"), None);
        assert_eq!(task_sequence_number("1700000000000"), None);
    }

    #[test]
    fn validate_rejects_last_sequence_number() {
        let id = format_task_id(MAX_TASK_SEQUENCE);
        let task = Task::new(id.clone(), "edge", "mom", 0);
        assert_eq!(
            task.validate(500),
            Err(TaskValidationError::SequenceExhausted(id))
        );
        assert!(Task::new(format_task_id(MAX_TASK_SEQUENCE - 1), "edge", "mom", 0)
            .validate(500)
            .is_ok());
    }

    #[test]
    fn overdue_requires_open_task_with_past_due_date() {
        let mut task = Task::new("task_1", "water plants", "dad", 0);
        assert!(!task.is_overdue(100));
        task.due_date = Some(50);
        assert!(task.is_overdue(100));
        task.toggle(60);
        assert!(!task.is_overdue(100));
    }

    #[test]
    fn serializes_owner_as_user() {
        let task = Task::new("task_1", "walk dog", "kid1", 5);
        let json = serde_json::to_value(&task).expect("task should serialize");
        assert_eq!(json["user"], "kid1");
        assert_eq!(json["createdAt"], 5);
        assert!(json.get("priority").is_none());
    }
}
