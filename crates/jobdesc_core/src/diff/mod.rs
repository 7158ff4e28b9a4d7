//! Version-to-version comparison of job description snapshots.
//!
//! # Responsibility
//! - Report which scalar fields and which child lists differ between a
//!   version and its immediate predecessor.
//!
//! # See also
//! - `service::jd_service` for loading both snapshots.

pub mod version_diff;
