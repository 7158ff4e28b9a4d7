//! Job description domain model.
//!
//! # Responsibility
//! - Define the aggregate (root record + owned child collections).
//! - Define reference catalog entries and tagged asset references.
//! - Own the invariants checked before any persistence call.
//!
//! # Invariants
//! - Every aggregate is identified by a stable `JobDescriptionId`.
//! - Child items have no identity of their own; they are replaced wholesale.

pub mod asset;
pub mod catalog;
pub mod job_description;
pub mod percentages;
pub mod validation;
