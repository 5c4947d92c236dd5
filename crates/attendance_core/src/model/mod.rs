//! Student domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by store, sync and controller.
//! - Keep one store-facing shape and one UI-facing shape.
//!
//! # Invariants
//! - Every student is identified by a store-assigned `StudentId`.
//! - Attendance counts are non-negative by construction (`u32`).

pub mod student;
