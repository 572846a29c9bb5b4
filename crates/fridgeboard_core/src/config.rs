//! Dashboard configuration.
//!
//! # Responsibility
//! - Hold every tunable the core needs in one explicitly constructed value.
//! - Validate user roster and limits before any component is built.
//!
//! # Invariants
//! - There is no ambient/global configuration; callers pass this value down.
//! - User ids are trimmed and lowercase.
//! - `default_user` is always a member of `users`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const DEFAULT_STORAGE_PREFIX: &str = "smartFridge_";
const DEFAULT_USERS: &[&str] = &["mom", "dad", "kid1", "kid2"];
const DEFAULT_MAX_WATER: u32 = 8;
const DEFAULT_HISTORY_LIMIT: usize = 50;
const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_TASK_TEXT_LEN: usize = 500;
const DEFAULT_MAX_MEDICATION_NAME_LEN: usize = 64;

/// Runtime configuration shared by store, persistence and services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Prefix applied to every storage key.
    pub storage_prefix: String,
    /// Household users allowed to own tasks and be active.
    pub users: Vec<String>,
    /// User selected when nothing valid is persisted.
    pub default_user: String,
    /// Daily water goal in glasses.
    pub max_water: u32,
    /// Max entries kept in the store change history.
    pub history_limit: usize,
    /// Quiet period before a debounced save is written.
    pub autosave_delay: Duration,
    /// Max task text length in chars, after trimming.
    pub max_task_text_len: usize,
    /// Max medication name length in chars.
    pub max_medication_name_len: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            users: DEFAULT_USERS.iter().map(|user| user.to_string()).collect(),
            default_user: DEFAULT_USERS[0].to_string(),
            max_water: DEFAULT_MAX_WATER,
            history_limit: DEFAULT_HISTORY_LIMIT,
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS),
            max_task_text_len: DEFAULT_MAX_TASK_TEXT_LEN,
            max_medication_name_len: DEFAULT_MAX_MEDICATION_NAME_LEN,
        }
    }
}

impl DashboardConfig {
    /// Returns a copy with a custom user roster; the first user becomes default.
    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = users.into_iter().map(Into::into).collect();
        if let Some(first) = self.users.first() {
            self.default_user = first.clone();
        }
        self
    }

    /// Normalizes user ids and checks limits.
    ///
    /// # Errors
    /// - `EmptyStoragePrefix` when the prefix is blank.
    /// - `NoUsers` / `InvalidUserId` / `DuplicateUser` for roster problems.
    /// - `UnknownDefaultUser` when `default_user` is not in `users`.
    /// - `ZeroLimit` when a limit that must be positive is zero.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.storage_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyStoragePrefix);
        }
        if self.users.is_empty() {
            return Err(ConfigError::NoUsers);
        }

        let mut normalized = Vec::with_capacity(self.users.len());
        for user in &self.users {
            let id = normalize_user_id(user);
            if id.is_empty() || id.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidUserId(user.clone()));
            }
            if normalized.contains(&id) {
                return Err(ConfigError::DuplicateUser(id));
            }
            normalized.push(id);
        }
        self.users = normalized;

        self.default_user = normalize_user_id(&self.default_user);
        if !self.users.contains(&self.default_user) {
            return Err(ConfigError::UnknownDefaultUser(self.default_user));
        }

        if self.max_water == 0 {
            return Err(ConfigError::ZeroLimit("max_water"));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::ZeroLimit("history_limit"));
        }
        if self.max_task_text_len == 0 {
            return Err(ConfigError::ZeroLimit("max_task_text_len"));
        }
        if self.max_medication_name_len == 0 {
            return Err(ConfigError::ZeroLimit("max_medication_name_len"));
        }
        Ok(self)
    }

    /// Returns whether `user` (after normalization) is a configured user.
    pub fn is_known_user(&self, user: &str) -> bool {
        let id = normalize_user_id(user);
        self.users.iter().any(|known| *known == id)
    }

    /// Full storage key for one logical field.
    pub fn storage_key(&self, field: &str) -> String {
        format!("{}{}", self.storage_prefix, field)
    }
}

/// Trims and lowercases a user id.
pub fn normalize_user_id(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Configuration rejected by `DashboardConfig::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyStoragePrefix,
    NoUsers,
    InvalidUserId(String),
    DuplicateUser(String),
    UnknownDefaultUser(String),
    ZeroLimit(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStoragePrefix => write!(f, "storage prefix must not be blank"),
            Self::NoUsers => write!(f, "at least one user must be configured"),
            Self::InvalidUserId(value) => write!(f, "invalid user id: `{value}`"),
            Self::DuplicateUser(value) => write!(f, "user configured twice: `{value}`"),
            Self::UnknownDefaultUser(value) => {
                write!(f, "default user `{value}` is not a configured user")
            }
            Self::ZeroLimit(field) => write!(f, "`{field}` must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DashboardConfig};

    #[test]
    fn default_config_is_valid() {
        let config = DashboardConfig::default()
            .validate()
            .expect("default config should validate");
        assert_eq!(config.default_user, "mom");
        assert_eq!(config.max_water, 8);
        assert_eq!(config.storage_key("tasks"), "smartFridge_tasks");
    }

    #[test]
    fn validate_normalizes_user_ids() {
        let config = DashboardConfig::default()
            .with_users([" Alice ", "BOB"])
            .validate()
            .expect("roster should validate");
        assert_eq!(config.users, vec!["alice", "bob"]);
        assert_eq!(config.default_user, "alice");
        assert!(config.is_known_user("Bob"));
        assert!(!config.is_known_user("carol"));
    }

    #[test]
    fn validate_rejects_duplicate_users() {
        let err = DashboardConfig::default()
            .with_users(["ann", "ANN"])
            .validate()
            .expect_err("duplicate users must be rejected");
        assert_eq!(err, ConfigError::DuplicateUser("ann".to_string()));
    }

    #[test]
    fn validate_rejects_unknown_default_user() {
        let config = DashboardConfig {
            default_user: "grandpa".to_string(),
            ..DashboardConfig::default()
        };
        let err = config.validate().expect_err("unknown default must fail");
        assert!(matches!(err, ConfigError::UnknownDefaultUser(_)));
    }

    #[test]
    fn validate_rejects_zero_water_goal() {
        let config = DashboardConfig {
            max_water: 0,
            ..DashboardConfig::default()
        };
        assert_eq!(
            config.validate().expect_err("zero goal must fail"),
            ConfigError::ZeroLimit("max_water")
        );
    }
}
