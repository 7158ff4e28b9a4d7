//! Conversion between the flat edit-form state and the persisted shape.
//!
//! # Responsibility
//! - Flatten per-category buffers into tagged, ordered child lists.
//! - Partition persisted child lists back into per-category buffers.
//!
//! # See also
//! - `model::job_description` for the persisted shape.

pub mod form;
