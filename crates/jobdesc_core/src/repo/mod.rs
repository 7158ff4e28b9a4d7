//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define per-table store contracts for the job description aggregate.
//! - Isolate SQLite query details from orchestration.
//! - Provide read-only catalog access and the audit sink.
//!
//! # Invariants
//! - Every store call touches one logical table; no call spans the root and
//!   a child collection.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod audit_repo;
pub mod catalog_repo;
pub mod jd_repo;
