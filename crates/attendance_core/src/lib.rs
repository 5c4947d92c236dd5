//! Core logic for the student attendance tracker.
//! This crate is the single source of truth for attendance invariants.

pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use controller::{AttendanceController, AttendanceView, ControllerPhase, RowView};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::student::{normalize_name, Student, StudentId, StudentValidationError, StudentView};
pub use repo::student_repo::{
    RepoError, RepoResult, SqliteStudentRepository, StudentRepository,
};
pub use service::sync_client::{SyncClient, SyncError, SyncResult, DEFAULT_STORE_TIMEOUT};
pub use session::{
    login, LoginError, Session, SessionEvent, SessionManager, SessionNotifier,
    SessionSubscription,
};
pub use store::{InMemoryStudentStore, SqliteStudentStore, StudentStore};

/// Minimal health-check API for front-end wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
