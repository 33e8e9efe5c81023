//! Domain model for hierarchies, terms and items.
//!
//! # Responsibility
//! - Define the read shapes consumed by permalink generation and recovery.
//! - Keep identity types explicit in signatures.
//!
//! # Invariants
//! - Terms form a forest per hierarchy; the core never writes parent links.
//! - Items are read-only inputs; nothing here persists state.

pub mod item;
pub mod term;
