//! Student repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the record store operations over canonical `students` storage.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `create_student` re-validates the name before any SQL mutation.
//! - `list_students` is ordered by `id ASC`.
//! - `increment_attendance` is a single UPDATE computed from the persisted
//!   value; callers never supply the new count.
//! - `increment_attendance` never writes a count above `u32::MAX`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::student::{normalize_name, Student, StudentId, StudentValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_COLUMNS: &str = "id, name, attendance_count";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for student persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(StudentValidationError),
    Db(DbError),
    NotFound(StudentId),
    InvalidData(String),
    /// Store could not be reached at all.
    Unavailable(String),
    /// Store worker failed outside of SQL execution.
    Internal(String),
}

impl RepoError {
    /// Returns whether this error is a connectivity failure.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Db(err) => err.is_connectivity(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
            Self::Unavailable(message) => write!(f, "student store unavailable: {message}"),
            Self::Internal(message) => write!(f, "student store internal failure: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::Unavailable(_)
            | Self::Internal(_) => None,
        }
    }
}

impl From<StudentValidationError> for RepoError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the student record store.
pub trait StudentRepository {
    /// Inserts one student with `attendance_count = 0`.
    fn create_student(&self, name: &str) -> RepoResult<Student>;
    /// Returns every student ordered by ascending id.
    fn list_students(&self) -> RepoResult<Vec<Student>>;
    /// Atomically adds one attendance event and returns the updated row.
    fn increment_attendance(&self, id: StudentId) -> RepoResult<Student>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn create_student(&self, name: &str) -> RepoResult<Student> {
        let name = normalize_name(name)?;

        let student = self.conn.query_row(
            &format!(
                "INSERT INTO students (name, attendance_count)
                 VALUES (?1, 0)
                 RETURNING {STUDENT_COLUMNS};"
            ),
            params![name.as_str()],
            |row| Ok(parse_student_row(row)),
        )??;

        Ok(student)
    }

    fn list_students(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY id ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        Ok(students)
    }

    fn increment_attendance(&self, id: StudentId) -> RepoResult<Student> {
        let updated = self
            .conn
            .query_row(
                &format!(
                    "UPDATE students
                     SET
                        attendance_count = attendance_count + 1,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?1 AND attendance_count < ?2
                     RETURNING {STUDENT_COLUMNS};"
                ),
                params![id, u32::MAX],
                |row| Ok(parse_student_row(row)),
            )
            .optional()?;

        if let Some(student) = updated {
            return student;
        }

        // Zero rows: either no such id or the count is already at its ceiling.
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1);",
            params![id],
            |row| row.get(0),
        )?;
        if exists {
            Err(RepoError::InvalidData(format!(
                "attendance_count overflow for student {id}"
            )))
        } else {
            Err(RepoError::NotFound(id))
        }
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let raw_count: i64 = row.get("attendance_count")?;
    let attendance_count = u32::try_from(raw_count).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid attendance_count value `{raw_count}` in students.attendance_count"
        ))
    })?;

    let student = Student {
        id: row.get("id")?,
        name: row.get("name")?,
        attendance_count,
    };
    student.validate()?;
    Ok(student)
}
