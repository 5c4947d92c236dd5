//! Student domain model.
//!
//! # Responsibility
//! - Define the canonical student record persisted by the record store.
//! - Define the UI representation consumed by the controller/presentation.
//! - Own name normalization shared by every write path.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `name` is trimmed and non-empty.
//! - `attendance_count` starts at 0 and only grows by 1 per event.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned student identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type StudentId = i64;

/// Persisted student record as returned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Store-assigned primary key. Immutable once assigned.
    pub id: StudentId,
    /// Trimmed display name. Uniqueness is not enforced.
    pub name: String,
    /// Number of recorded attendance events.
    pub attendance_count: u32,
}

impl Student {
    /// Validates record invariants that the type system does not encode.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        if self.name.trim().is_empty() {
            return Err(StudentValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Student row as shown by the list view.
///
/// Serialized with camelCase keys to match the presentation layer naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: StudentId,
    pub name: String,
    pub attendance_count: u32,
}

impl StudentView {
    /// Row label rendered next to the "mark present" control.
    pub fn label(&self) -> String {
        format!("{} - Attendance: {}", self.name, self.attendance_count)
    }
}

impl From<Student> for StudentView {
    fn from(value: Student) -> Self {
        Self {
            id: value.id,
            name: value.name,
            attendance_count: value.attendance_count,
        }
    }
}

/// Validation failures for student input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentValidationError {
    /// Name is empty or whitespace-only.
    EmptyName,
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "student name cannot be empty"),
        }
    }
}

impl Error for StudentValidationError {}

/// Trims surrounding whitespace and rejects empty names.
///
/// Every write path goes through this helper so the store and the sync
/// client agree on what a valid name is.
pub fn normalize_name(raw: &str) -> Result<String, StudentValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StudentValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
