//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the collaborator contracts the permalink engine reads from.
//! - Isolate SQLite query details from service/engine orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`TermNotFound`,
//!   `HierarchyNotFound`) in addition to DB transport errors.
//! - Lookups of absent rows return `Ok(None)`, not an error.
//! - All SQL is parameterized; no value is interpolated into statements.

pub mod item_repo;
pub mod term_repo;
