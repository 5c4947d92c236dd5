//! SQLite-backed record store.
//!
//! Blocking SQL runs on the tokio blocking pool. The connection sits behind a
//! mutex, so calls against one store are serialized in lock order.
//!
//! Writes run in an immediate transaction and only commit while the caller
//! is still waiting. A caller that stops waiting (timeout, `select!`, drop)
//! abandons the write, and the worker rolls it back instead of committing.

use super::StudentStore;
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::{
    RepoError, RepoResult, SqliteStudentRepository, StudentRepository,
};
use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const WRITE_PENDING: u8 = 0;
const WRITE_COMMITTING: u8 = 1;
const WRITE_ABANDONED: u8 = 2;

/// Decides, exactly once, whether a write commits or is abandoned.
#[derive(Default)]
struct WriteGate(AtomicU8);

impl WriteGate {
    /// Claims the commit. Fails once the caller has abandoned the write.
    fn try_commit(&self) -> bool {
        self.0
            .compare_exchange(WRITE_PENDING, WRITE_COMMITTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(WRITE_PENDING, WRITE_ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::SeqCst) == WRITE_ABANDONED
    }
}

/// Held by the caller side of a write; abandons it when dropped early.
struct AbandonOnDrop(Option<Arc<WriteGate>>);

impl AbandonOnDrop {
    /// The caller received the worker's answer, so there is nothing to abandon.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if let Some(gate) = self.0.take() {
            if gate.abandon() {
                debug!("event=store_write module=store status=abandoned");
            }
        }
    }
}

fn abandoned() -> RepoError {
    RepoError::Unavailable("caller stopped waiting; write rolled back".to_string())
}

/// Durable student store over one migrated SQLite connection.
#[derive(Clone)]
pub struct SqliteStudentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStudentStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Opens (or creates) a database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    async fn with_repo<T, F>(&self, op: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteStudentRepository<'_>) -> RepoResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn)?;
            op(&SqliteStudentRepository::new(&guard))
        })
        .await
        .map_err(|err| RepoError::Internal(format!("sqlite worker failed: {err}")))?
    }

    /// Like `with_repo`, but commits only if this future is still alive.
    async fn with_write<T, F>(&self, op: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteStudentRepository<'_>) -> RepoResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let gate = Arc::new(WriteGate::default());
        let abandon = AbandonOnDrop(Some(Arc::clone(&gate)));

        let joined = tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            if gate.is_abandoned() {
                return Err(abandoned());
            }

            let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = op(&SqliteStudentRepository::new(&tx))?;
            if !gate.try_commit() {
                // Dropping `tx` rolls back.
                debug!("event=store_write module=store status=rolled_back");
                return Err(abandoned());
            }
            tx.commit()?;
            Ok(value)
        })
        .await;
        abandon.disarm();

        joined.map_err(|err| RepoError::Internal(format!("sqlite worker failed: {err}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> RepoResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| RepoError::Internal("sqlite connection lock poisoned".to_string()))
}

#[async_trait]
impl StudentStore for SqliteStudentStore {
    async fn create(&self, name: &str) -> RepoResult<Student> {
        let name = name.to_string();
        self.with_write(move |repo| repo.create_student(&name)).await
    }

    async fn list(&self) -> RepoResult<Vec<Student>> {
        self.with_repo(|repo| repo.list_students()).await
    }

    async fn increment_attendance(&self, id: StudentId) -> RepoResult<Student> {
        self.with_write(move |repo| repo.increment_attendance(id))
            .await
    }
}
