//! Local in-memory record store.
//!
//! Mirrors the SQLite store semantics without persistence. Used for tests and
//! for running the controller without a database. Reachability can be toggled
//! to exercise `Unavailable` handling.

use super::StudentStore;
use crate::model::student::{normalize_name, Student, StudentId};
use crate::repo::student_repo::{RepoError, RepoResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: StudentId,
    rows: BTreeMap<StudentId, Student>,
}

/// In-process student store with store-assigned monotonic ids.
#[derive(Debug, Default)]
pub struct InMemoryStudentStore {
    state: Mutex<MemoryState>,
    unreachable: AtomicBool,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `RepoError::Unavailable` until
    /// reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of stored rows, regardless of reachability.
    pub fn len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable(
                "in-memory store marked unreachable".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| RepoError::Internal("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl StudentStore for InMemoryStudentStore {
    async fn create(&self, name: &str) -> RepoResult<Student> {
        let name = normalize_name(name)?;
        let mut state = self.state()?;

        state.last_id += 1;
        let student = Student {
            id: state.last_id,
            name,
            attendance_count: 0,
        };
        state.rows.insert(student.id, student.clone());
        Ok(student)
    }

    async fn list(&self) -> RepoResult<Vec<Student>> {
        let state = self.state()?;
        Ok(state.rows.values().cloned().collect())
    }

    async fn increment_attendance(&self, id: StudentId) -> RepoResult<Student> {
        let mut state = self.state()?;
        let student = state.rows.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        student.attendance_count = student.attendance_count.checked_add(1).ok_or_else(|| {
            RepoError::InvalidData(format!("attendance_count overflow for student {id}"))
        })?;
        Ok(student.clone())
    }
}
