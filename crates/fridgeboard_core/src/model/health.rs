//! Medication name rules shared by the health service and persistence.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static CONTROL_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Cc}").expect("valid control char regex"));

/// Medication name rejected by `validate_medication_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MedicationNameError {
    Empty,
    TooLong { len: usize, max: usize },
    ControlCharacters(String),
}

impl Display for MedicationNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "medication name must not be blank"),
            Self::TooLong { len, max } => {
                write!(f, "medication name is {len} chars; maximum is {max}")
            }
            Self::ControlCharacters(name) => {
                write!(f, "medication name contains control characters: {name:?}")
            }
        }
    }
}

impl Error for MedicationNameError {}

/// Trims `name` and checks it; returns the trimmed name.
pub fn validate_medication_name(name: &str, max_len: usize) -> Result<String, MedicationNameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(MedicationNameError::Empty);
    }
    if CONTROL_CHAR_RE.is_match(trimmed) {
        return Err(MedicationNameError::ControlCharacters(trimmed.to_string()));
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(MedicationNameError::TooLong { len, max: max_len });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{validate_medication_name, MedicationNameError};

    #[test]
    fn trims_valid_names() {
        assert_eq!(
            validate_medication_name("  vitamin D ", 64).expect("valid name"),
            "vitamin D"
        );
    }

    #[test]
    fn rejects_blank_long_and_control_names() {
        assert_eq!(validate_medication_name(" ", 64), Err(MedicationNameError::Empty));
        assert!(matches!(
            validate_medication_name("abcdef", 3),
            Err(MedicationNameError::TooLong { len: 6, max: 3 })
        ));
        assert!(matches!(
            validate_medication_name("iron\u{7}", 64),
            Err(MedicationNameError::ControlCharacters(_))
        ));
    }
}
