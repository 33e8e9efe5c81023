//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate registry, site config and store calls into permalink
//!   use-case APIs.
//! - Keep the CLI and host adapters decoupled from storage details.

pub mod permalink_service;
