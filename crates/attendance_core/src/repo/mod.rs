//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store data access contract.
//! - Isolate SQLite query details from sync/controller orchestration.
//!
//! # Invariants
//! - Repository writes normalize names before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod student_repo;
