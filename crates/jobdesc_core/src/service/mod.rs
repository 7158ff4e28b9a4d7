//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate per-table store calls into aggregate-level operations.
//! - Keep callers decoupled from storage details and failure bookkeeping.

pub mod jd_service;
