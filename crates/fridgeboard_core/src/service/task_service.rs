//! Household task use-cases.
//!
//! # Responsibility
//! - Create, toggle, edit, delete and clear tasks.
//! - Allocate `task_<n>` ids from the store counter.
//! - Report input problems as a `ValidationReport` before writing.
//!
//! # Invariants
//! - Task text is trimmed and inner whitespace collapsed before storage.
//! - Task owners are configured household users.
//! - A new id never collides with an id already in the list.

use crate::config::normalize_user_id;
use crate::events::DashboardEvent;
use crate::model::state::{DashboardState, StateValue};
use crate::model::task::{
    format_task_id, validate_task_text, Task, TaskId, TaskPriority, TaskValidationError,
};
use crate::model::validation::{ValidationReport, ValidationWarning};
use crate::service::ServiceContext;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Text above this length is accepted with a warning.
const LONG_TEXT_WARNING_CHARS: usize = 200;

/// Service error for task use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskServiceError {
    /// Input failed validation.
    Invalid(TaskValidationError),
    /// Target task does not exist.
    TaskNotFound(TaskId),
    /// The id counter has no sequence number left to allocate.
    IdsExhausted,
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::IdsExhausted => write!(f, "no task ids left to allocate"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::TaskNotFound(_) | Self::IdsExhausted => None,
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Input for `TaskService::add_task`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    /// Defaults to the current user.
    pub owner: Option<String>,
    pub priority: Option<TaskPriority>,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub due_date: Option<i64>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Partial edit; `None` leaves a field unchanged, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub text: Option<String>,
    pub priority: Option<Option<TaskPriority>>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<i64>>,
}

/// Counters for one owner or the whole household.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

/// Task service facade over the shared store.
pub struct TaskService {
    ctx: ServiceContext,
}

impl TaskService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Checks input without writing anything.
    pub fn validate_task_input(&self, input: &NewTask) -> ValidationReport {
        let mut report = ValidationReport::default();

        match validate_task_text(&input.text, self.ctx.config.max_task_text_len) {
            Ok(()) => {
                let len = normalize_text(&input.text).chars().count();
                if len > LONG_TEXT_WARNING_CHARS {
                    report.warnings.push(ValidationWarning::LongText { len });
                }
            }
            Err(err) => report.errors.push(err),
        }

        if let Some(owner) = input.owner.as_deref() {
            if !self.ctx.config.is_known_user(owner) {
                report
                    .errors
                    .push(TaskValidationError::UnknownOwner(owner.to_string()));
            }
        }

        if input
            .due_date
            .is_some_and(|due| due < self.ctx.clock.now_ms())
        {
            report.warnings.push(ValidationWarning::DueDateInPast);
        }
        report
    }

    /// Appends a new open task and emits `task:added`.
    pub fn add_task(&self, input: NewTask) -> Result<Task, TaskServiceError> {
        let report = self.validate_task_input(&input);
        if let Some(err) = report.first_error() {
            return Err(err.clone().into());
        }

        let owner = match input.owner.as_deref() {
            Some(owner) => normalize_user_id(owner),
            None => self.ctx.store.current_user(),
        };

        let (mut tasks, sequence) = self.ctx.store.with_state(|state| {
            let sequence = state
                .next_task_id
                .max(DashboardState::min_next_task_id(&state.tasks));
            (state.tasks.clone(), sequence)
        });
        let Some(next_sequence) = sequence.checked_add(1) else {
            warn!("event=task_add module=service status=error reason=ids_exhausted");
            return Err(TaskServiceError::IdsExhausted);
        };

        let mut task = Task::new(
            format_task_id(sequence),
            normalize_text(&input.text),
            owner,
            self.ctx.clock.now_ms(),
        );
        task.priority = input.priority;
        task.description = normalize_optional(input.description);
        task.due_date = input.due_date;
        tasks.push(task.clone());

        self.ctx.store.update(
            [
                StateValue::Tasks(tasks),
                StateValue::NextTaskId(next_sequence),
            ],
            false,
        );
        info!(
            "event=task_add module=service status=ok task_id={} owner={}",
            task.id, task.owner
        );
        self.ctx.bus.emit(&DashboardEvent::TaskAdded(task.clone()));
        Ok(task)
    }

    /// Flips completion and emits `task:toggled`.
    pub fn toggle_task(&self, id: &str) -> Result<Task, TaskServiceError> {
        let now_ms = self.ctx.clock.now_ms();
        let task = self.modify(id, |task| {
            task.toggle(now_ms);
            Ok(())
        })?;
        self.ctx.bus.emit(&DashboardEvent::TaskToggled {
            id: task.id.clone(),
            completed: task.completed,
        });
        Ok(task)
    }

    /// Applies `edit` and emits `task:updated`.
    pub fn edit_task(&self, id: &str, edit: TaskEdit) -> Result<Task, TaskServiceError> {
        let max_len = self.ctx.config.max_task_text_len;
        let task = self.modify(id, |task| {
            if let Some(text) = edit.text {
                validate_task_text(&text, max_len)?;
                task.text = normalize_text(&text);
            }
            if let Some(priority) = edit.priority {
                task.priority = priority;
            }
            if let Some(description) = edit.description {
                task.description = normalize_optional(description);
            }
            if let Some(due_date) = edit.due_date {
                task.due_date = due_date;
            }
            Ok(())
        })?;
        self.ctx.bus.emit(&DashboardEvent::TaskUpdated(task.clone()));
        Ok(task)
    }

    /// Removes one task and emits `task:deleted`.
    pub fn delete_task(&self, id: &str) -> Result<Task, TaskServiceError> {
        let mut tasks = self.ctx.store.tasks();
        let index = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))?;
        let removed = tasks.remove(index);

        self.ctx.store.set(StateValue::Tasks(tasks), false);
        info!("event=task_delete module=service status=ok task_id={}", removed.id);
        self.ctx.bus.emit(&DashboardEvent::TaskDeleted {
            id: removed.id.clone(),
        });
        Ok(removed)
    }

    /// Removes completed tasks (of one owner, or everyone's).
    ///
    /// Emits `tasks:cleared` only when something was removed.
    pub fn clear_completed(&self, owner: Option<&str>) -> usize {
        let owner = owner.map(normalize_user_id);
        let tasks = self.ctx.store.tasks();
        let before = tasks.len();
        let kept: Vec<Task> = tasks
            .into_iter()
            .filter(|task| !(task.completed && owner.as_ref().map_or(true, |o| *o == task.owner)))
            .collect();
        let removed = before - kept.len();
        if removed == 0 {
            return 0;
        }

        self.ctx.store.set(StateValue::Tasks(kept), false);
        self.ctx
            .bus
            .emit(&DashboardEvent::TasksCleared { owner, removed });
        removed
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.ctx
            .store
            .with_state(|state| state.tasks.iter().find(|task| task.id == id).cloned())
    }

    /// Tasks owned by `owner`, in creation order.
    pub fn tasks_for(&self, owner: &str) -> Vec<Task> {
        let owner = normalize_user_id(owner);
        self.ctx.store.with_state(|state| {
            state
                .tasks
                .iter()
                .filter(|task| task.owner == owner)
                .cloned()
                .collect()
        })
    }

    /// Tasks of the active user.
    pub fn current_user_tasks(&self) -> Vec<Task> {
        self.tasks_for(&self.ctx.store.current_user())
    }

    pub fn stats(&self, owner: Option<&str>) -> TaskStats {
        let owner = owner.map(normalize_user_id);
        let now_ms = self.ctx.clock.now_ms();
        self.ctx.store.with_state(|state| {
            state
                .tasks
                .iter()
                .filter(|task| owner.as_ref().map_or(true, |o| *o == task.owner))
                .fold(TaskStats::default(), |mut stats, task| {
                    stats.total += 1;
                    if task.completed {
                        stats.completed += 1;
                    } else {
                        stats.pending += 1;
                    }
                    if task.is_overdue(now_ms) {
                        stats.overdue += 1;
                    }
                    stats
                })
        })
    }

    fn modify(
        &self,
        id: &str,
        change: impl FnOnce(&mut Task) -> Result<(), TaskValidationError>,
    ) -> Result<Task, TaskServiceError> {
        let mut tasks = self.ctx.store.tasks();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))?;
        change(task)?;
        let updated = task.clone();

        self.ctx.store.set(StateValue::Tasks(tasks), false);
        info!("event=task_update module=service status=ok task_id={}", updated.id);
        Ok(updated)
    }
}

fn normalize_text(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| normalize_text(&text))
        .filter(|text| !text.is_empty())
}
