//! Tagged asset references.
//!
//! # Responsibility
//! - Carry the catalog/custom discriminator explicitly at persistence time.
//! - Decode legacy untagged token arrays without guessing their meaning.
//!
//! # Invariants
//! - A `Catalog` reference always stores the catalog item id, never its name.
//! - Legacy tokens are only turned into references by the resolver.

use serde::{Deserialize, Serialize};

/// One entry of the aggregate's asset field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetRef {
    /// Reference to a `company_assets` catalog item by id.
    Catalog { id: String },
    /// Free text that does not correspond to any catalog item.
    Custom { text: String },
}

impl AssetRef {
    pub fn catalog(id: impl Into<String>) -> Self {
        Self::Catalog { id: id.into() }
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Self::Custom { text: text.into() }
    }
}

/// Decoded content of the persisted `assets` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAssets {
    /// Current format: JSON array of tagged objects.
    Tagged(Vec<AssetRef>),
    /// Legacy format: JSON array of plain strings.
    Legacy(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredAssetsWire {
    Tagged(Vec<AssetRef>),
    Legacy(Vec<String>),
}

impl StoredAssets {
    /// Decodes the column text. An empty array is reported as tagged.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let wire: StoredAssetsWire = serde_json::from_str(raw)?;
        Ok(match wire {
            StoredAssetsWire::Tagged(refs) => Self::Tagged(refs),
            StoredAssetsWire::Legacy(tokens) => Self::Legacy(tokens),
        })
    }

    pub fn encode(refs: &[AssetRef]) -> Result<String, serde_json::Error> {
        serde_json::to_string(refs)
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }
}
