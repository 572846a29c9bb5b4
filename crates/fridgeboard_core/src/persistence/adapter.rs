//! Snapshot load/save against a `StorageBackend`.
//!
//! # Responsibility
//! - Load each persisted field defensively, falling back per field.
//! - Validate a whole snapshot before writing any field.
//!
//! # Invariants
//! - `load_all` fails only when storage itself cannot be read.
//! - `save_all` writes nothing when validation fails.
//! - Loaded `next_task_id` exceeds every allocated task id.

use crate::config::{normalize_user_id, DashboardConfig};
use crate::model::health::{validate_medication_name, MedicationNameError};
use crate::model::state::{DashboardState, MedicationStatus};
use crate::model::task::{Task, TaskValidationError};
use crate::persistence::storage::{StorageBackend, StorageError};
use log::{info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const TASKS_KEY: &str = "tasks";
pub const WATER_COUNT_KEY: &str = "waterCount";
pub const MEDICATION_KEY: &str = "medicationStatus";
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Logical fields persisted by the adapter, in write order.
pub const PERSISTED_FIELDS: [&str; 4] = [TASKS_KEY, WATER_COUNT_KEY, MEDICATION_KEY, CURRENT_USER_KEY];

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Snapshot rejected before writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    Task(TaskValidationError),
    UnknownCurrentUser(String),
    WaterAboveGoal { count: u32, max: u32 },
    Medication(MedicationNameError),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task(err) => write!(f, "{err}"),
            Self::UnknownCurrentUser(user) => write!(f, "unknown current user: `{user}`"),
            Self::WaterAboveGoal { count, max } => {
                write!(f, "water count {count} exceeds the goal of {max}")
            }
            Self::Medication(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SnapshotError {}

impl From<TaskValidationError> for SnapshotError {
    fn from(value: TaskValidationError) -> Self {
        Self::Task(value)
    }
}

/// Persistence failure.
#[derive(Debug)]
pub enum PersistenceError {
    Storage(StorageError),
    Invalid(SnapshotError),
    Encode(serde_json::Error),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Invalid(err) => write!(f, "invalid snapshot: {err}"),
            Self::Encode(err) => write!(f, "snapshot encoding failed: {err}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<StorageError> for PersistenceError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<SnapshotError> for PersistenceError {
    fn from(value: SnapshotError) -> Self {
        Self::Invalid(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Reads and writes dashboard snapshots as prefixed JSON values.
pub struct PersistenceAdapter<S: StorageBackend> {
    storage: S,
    config: DashboardConfig,
}

impl<S: StorageBackend> PersistenceAdapter<S> {
    pub fn new(storage: S, config: DashboardConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Loads every persisted field.
    ///
    /// Missing, malformed or wrongly shaped values fall back to that field's
    /// default; individually invalid tasks are dropped.
    ///
    /// # Errors
    /// - `Storage` when a field cannot be read at all.
    pub fn load_all(&self) -> PersistenceResult<DashboardState> {
        let mut state = DashboardState::initial(&self.config);

        if let Some(value) = self.read_json(TASKS_KEY)? {
            state.tasks = self.parse_tasks(value);
        }
        if let Some(value) = self.read_json(WATER_COUNT_KEY)? {
            state.water_count = self.parse_water_count(&value);
        }
        if let Some(value) = self.read_json(MEDICATION_KEY)? {
            state.medication = self.parse_medication(value);
        }
        if let Some(value) = self.read_json(CURRENT_USER_KEY)? {
            state.current_user = self.parse_current_user(&value);
        }
        state.next_task_id = DashboardState::min_next_task_id(&state.tasks);

        info!(
            "event=state_load module=persistence status=ok tasks={} water_count={} medications={}",
            state.tasks.len(),
            state.water_count,
            state.medication.len()
        );
        Ok(state)
    }

    /// Validates `state`, then writes each field.
    ///
    /// Returns the number of keys written.
    ///
    /// # Errors
    /// - `Invalid` with the first validation failure; nothing is written.
    /// - `Storage` with the first failed write; other fields are still
    ///   attempted.
    pub fn save_all(&self, state: &DashboardState) -> PersistenceResult<usize> {
        self.validate(state)?;

        let encoded = [
            (TASKS_KEY, serde_json::to_string(&state.tasks)?),
            (WATER_COUNT_KEY, serde_json::to_string(&state.water_count)?),
            (MEDICATION_KEY, serde_json::to_string(&state.medication)?),
            (CURRENT_USER_KEY, serde_json::to_string(&state.current_user)?),
        ];

        let mut first_error = None;
        let mut written = 0;
        for (field, json) in encoded {
            let key = self.config.storage_key(field);
            match self.storage.set_item(&key, &json) {
                Ok(()) => written += 1,
                Err(err) => {
                    warn!(
                        "event=state_save module=persistence status=error key={} error={}",
                        key, err
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(written),
        }
    }

    /// Removes every persisted field.
    pub fn clear_all(&self) -> PersistenceResult<()> {
        for field in PERSISTED_FIELDS {
            self.storage.remove_item(&self.config.storage_key(field))?;
        }
        info!("event=state_clear module=persistence status=ok");
        Ok(())
    }

    /// Checks a snapshot the same way `save_all` does.
    pub fn validate(&self, state: &DashboardState) -> Result<(), SnapshotError> {
        let mut seen = HashSet::new();
        for task in &state.tasks {
            self.validate_task(task)?;
            if !seen.insert(task.id.as_str()) {
                return Err(TaskValidationError::DuplicateId(task.id.clone()).into());
            }
        }
        if !self.config.is_known_user(&state.current_user) {
            return Err(SnapshotError::UnknownCurrentUser(state.current_user.clone()));
        }
        if state.water_count > self.config.max_water {
            return Err(SnapshotError::WaterAboveGoal {
                count: state.water_count,
                max: self.config.max_water,
            });
        }
        for name in state.medication.keys() {
            validate_medication_name(name, self.config.max_medication_name_len)
                .map_err(SnapshotError::Medication)?;
        }
        Ok(())
    }

    fn validate_task(&self, task: &Task) -> Result<(), TaskValidationError> {
        task.validate(self.config.max_task_text_len)?;
        if !self.config.is_known_user(&task.owner) {
            return Err(TaskValidationError::UnknownOwner(task.owner.clone()));
        }
        Ok(())
    }

    fn read_json(&self, field: &str) -> PersistenceResult<Option<Value>> {
        let key = self.config.storage_key(field);
        let Some(raw) = self.storage.get_item(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(
                    "event=state_load module=persistence status=fallback key={} reason=malformed_json error={}",
                    key, err
                );
                Ok(None)
            }
        }
    }

    fn parse_tasks(&self, value: Value) -> Vec<Task> {
        let Value::Array(items) = value else {
            warn!("event=state_load module=persistence status=fallback field=tasks reason=not_array");
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(items.len());
        for item in items {
            let mut task = match serde_json::from_value::<Task>(item) {
                Ok(task) => task,
                Err(err) => {
                    warn!("event=task_drop module=persistence status=fallback reason=shape error={err}");
                    continue;
                }
            };
            task.owner = normalize_user_id(&task.owner);
            if let Err(err) = self.validate_task(&task) {
                warn!(
                    "event=task_drop module=persistence status=fallback task_id={} error={}",
                    task.id, err
                );
                continue;
            }
            if !seen.insert(task.id.clone()) {
                warn!(
                    "event=task_drop module=persistence status=fallback task_id={} reason=duplicate_id",
                    task.id
                );
                continue;
            }
            tasks.push(task);
        }
        tasks
    }

    fn parse_water_count(&self, value: &Value) -> u32 {
        let Some(count) = value.as_u64().and_then(|count| u32::try_from(count).ok()) else {
            warn!("event=state_load module=persistence status=fallback field=water_count reason=not_non_negative_integer");
            return 0;
        };
        if count > self.config.max_water {
            warn!(
                "event=state_load module=persistence status=clamped field=water_count value={} max={}",
                count, self.config.max_water
            );
            return self.config.max_water;
        }
        count
    }

    fn parse_medication(&self, value: Value) -> MedicationStatus {
        match serde_json::from_value::<MedicationStatus>(value) {
            Ok(status) => status
                .into_iter()
                .filter_map(|(name, taken)| {
                    validate_medication_name(&name, self.config.max_medication_name_len)
                        .ok()
                        .map(|name| (name, taken))
                })
                .collect(),
            Err(err) => {
                warn!(
                    "event=state_load module=persistence status=fallback field=medication reason=shape error={}",
                    err
                );
                MedicationStatus::new()
            }
        }
    }

    fn parse_current_user(&self, value: &Value) -> String {
        match value.as_str() {
            Some(user) if self.config.is_known_user(user) => normalize_user_id(user),
            _ => {
                warn!("event=state_load module=persistence status=fallback field=current_user reason=unknown_user");
                self.config.default_user.clone()
            }
        }
    }
}
