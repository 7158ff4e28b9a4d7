//! Reference resolution against read-only catalogs.
//!
//! # Responsibility
//! - Split untagged asset tokens into catalog references and custom text.
//!
//! # See also
//! - `model::asset` for the tagged representation written by current code.

pub mod asset_resolver;
