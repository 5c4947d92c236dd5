//! Sync client between the controller and the record store.
//!
//! # Responsibility
//! - Expose `add_student`, `fetch_all` and `mark_present` to the UI layer.
//! - Validate input locally so invalid names never reach the store.
//! - Normalize store failures into the `SyncError` taxonomy.
//! - Bound every store call with a timeout.
//!
//! # Invariants
//! - A validation failure performs no store call.
//! - `fetch_all` preserves store order.
//! - A timed-out call surfaces as `SyncError::Unavailable`.

use crate::model::student::{normalize_name, StudentId, StudentValidationError, StudentView};
use crate::repo::student_repo::{RepoError, RepoResult};
use crate::store::StudentStore;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Store call timeout used when none is configured.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure kinds surfaced to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Empty or whitespace-only name. Never reaches the store.
    Validation(StudentValidationError),
    /// Target student no longer exists; the row should be dropped.
    NotFound(StudentId),
    /// Store unreachable or timed out. Safe to retry.
    Unavailable(String),
    /// Anything else. Logged and surfaced generically.
    Unexpected(String),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "student {id} no longer exists"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::Unexpected(message) => write!(f, "unexpected failure: {message}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StudentValidationError> for SyncError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        if value.is_unavailable() {
            return Self::Unavailable(value.to_string());
        }
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Unexpected(other.to_string()),
        }
    }
}

/// Store-agnostic client used by the controller.
pub struct SyncClient<S: StudentStore + ?Sized> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: StudentStore + ?Sized> Clone for SyncClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: StudentStore + ?Sized> SyncClient<S> {
    /// Creates a client with `DEFAULT_STORE_TIMEOUT`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Trims and validates `name`, then creates the student.
    pub async fn add_student(&self, name: &str) -> SyncResult<StudentView> {
        let name = match normalize_name(name) {
            Ok(name) => name,
            Err(err) => {
                info!("event=student_add module=sync status=rejected reason=empty_name");
                return Err(err.into());
            }
        };

        let name_len = name.chars().count();
        let student = self
            .call("student_add", self.store.create(&name))
            .await?;
        info!(
            "event=student_add module=sync status=ok id={} name_len={}",
            student.id, name_len
        );
        Ok(student.into())
    }

    /// Loads every student in store order.
    pub async fn fetch_all(&self) -> SyncResult<Vec<StudentView>> {
        let students = self.call("student_list", self.store.list()).await?;
        info!(
            "event=student_list module=sync status=ok count={}",
            students.len()
        );
        Ok(students.into_iter().map(StudentView::from).collect())
    }

    /// Records one attendance event for `id`.
    pub async fn mark_present(&self, id: StudentId) -> SyncResult<StudentView> {
        let student = self
            .call("student_mark_present", self.store.increment_attendance(id))
            .await?;
        info!(
            "event=student_mark_present module=sync status=ok id={} attendance_count={}",
            student.id, student.attendance_count
        );
        Ok(student.into())
    }

    async fn call<T>(
        &self,
        event: &'static str,
        request: impl Future<Output = RepoResult<T>>,
    ) -> SyncResult<T> {
        let started_at = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::Unavailable(format!(
                "request timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        if let Err(err) = &outcome {
            let duration_ms = started_at.elapsed().as_millis();
            match err {
                SyncError::Unexpected(_) => error!(
                    "event={event} module=sync status=error error_code={} duration_ms={duration_ms} error={err}",
                    err.kind()
                ),
                _ => warn!(
                    "event={event} module=sync status=error error_code={} duration_ms={duration_ms} error={err}",
                    err.kind()
                ),
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::SyncError;
    use crate::db::DbError;
    use crate::model::student::StudentValidationError;
    use crate::repo::student_repo::RepoError;

    #[test]
    fn repo_errors_map_onto_sync_taxonomy() {
        assert_eq!(
            SyncError::from(RepoError::NotFound(3)),
            SyncError::NotFound(3)
        );
        assert_eq!(
            SyncError::from(RepoError::Validation(StudentValidationError::EmptyName)),
            SyncError::Validation(StudentValidationError::EmptyName)
        );
        assert!(matches!(
            SyncError::from(RepoError::Unavailable("down".to_string())),
            SyncError::Unavailable(_)
        ));
        assert!(matches!(
            SyncError::from(RepoError::InvalidData("bad row".to_string())),
            SyncError::Unexpected(_)
        ));
    }

    #[test]
    fn busy_database_is_unavailable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let mapped = SyncError::from(RepoError::Db(DbError::Sqlite(busy)));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(SyncError::Unavailable("x".to_string()).is_retryable());
        assert!(!SyncError::NotFound(1).is_retryable());
        assert!(!SyncError::Unexpected("x".to_string()).is_retryable());
    }
}
