//! Async record store capability and its implementations.
//!
//! # Responsibility
//! - Define the capability set `{create, list, increment_attendance}` the
//!   sync client is polymorphic over.
//! - Provide a durable SQLite store and a local in-memory store that can be
//!   swapped behind the same trait object.
//!
//! # Invariants
//! - `list` returns rows ordered by ascending id.
//! - `increment_attendance` is computed from the store's current value.
//! - A call resolves with a value or fails with one `RepoError`, never both.

mod memory;
mod sqlite;

use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::RepoResult;
use async_trait::async_trait;

pub use memory::InMemoryStudentStore;
pub use sqlite::SqliteStudentStore;

/// Request/response access to the student record store.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Persists a new student with zero attendance.
    async fn create(&self, name: &str) -> RepoResult<Student>;
    /// Returns all students ordered by ascending id.
    async fn list(&self) -> RepoResult<Vec<Student>>;
    /// Adds exactly one attendance event to the student.
    async fn increment_attendance(&self, id: StudentId) -> RepoResult<Student>;
}
