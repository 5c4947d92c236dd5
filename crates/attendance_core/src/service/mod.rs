//! Use-case services.
//!
//! # Responsibility
//! - Translate UI commands into record store calls.
//! - Keep the controller decoupled from storage details.

pub mod sync_client;
