//! Input validation report.
//!
//! Used by services that pre-check user input before a write, so a form can
//! show every problem at once instead of the first one.

use crate::model::task::TaskValidationError;
use std::fmt::{Display, Formatter};

/// Non-blocking input concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Due date lies before the current time.
    DueDateInPast,
    /// Text is accepted but unusually long for a fridge tile.
    LongText { len: usize },
}

impl Display for ValidationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DueDateInPast => write!(f, "due date is in the past"),
            Self::LongText { len } => write!(f, "task text is long ({len} chars)"),
        }
    }
}

/// Outcome of input validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<TaskValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the first blocking error, if any.
    pub fn first_error(&self) -> Option<&TaskValidationError> {
        self.errors.first()
    }
}
