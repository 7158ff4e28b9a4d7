//! Asset token resolver.
//!
//! # Responsibility
//! - Classify tokens as catalog ids (matched by id, or by exact
//!   case-sensitive name) or custom free-text entries.
//! - Re-run against a catalog that arrives later without duplicating ids.
//!
//! # Invariants
//! - A selection keeps the order of its entries; `from_refs` followed by
//!   `to_refs` returns the input unchanged.
//! - An empty catalog resolves every token as custom.
//! - Id matches take precedence over name matches.
//! - Pure: no I/O, no logging.

use crate::model::asset::AssetRef;
use crate::model::catalog::CatalogItem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered asset selection as held by an edit screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetSelection {
    entries: Vec<AssetRef>,
}

impl AssetSelection {
    /// Resolves raw tokens against `catalog`. A catalog id is kept once.
    pub fn resolve<S: AsRef<str>>(tokens: &[S], catalog: &[CatalogItem]) -> Self {
        let index = CatalogIndex::new(catalog);
        let mut selection = Self::default();
        for token in tokens {
            let token = token.as_ref();
            match index.lookup(token) {
                Some(id) if selection.contains_catalog_id(id) => {}
                Some(id) => selection.entries.push(AssetRef::catalog(id)),
                None => selection.entries.push(AssetRef::custom(token)),
            }
        }
        selection
    }

    /// Builds a selection from already tagged references, as stored.
    pub fn from_refs(refs: &[AssetRef]) -> Self {
        Self {
            entries: refs.to_vec(),
        }
    }

    /// Re-resolves custom entries against a (newly loaded) catalog.
    ///
    /// A matching entry becomes a catalog reference in place; it is dropped
    /// when that id is already selected.
    pub fn reconcile(&mut self, catalog: &[CatalogItem]) {
        let has_custom = self
            .entries
            .iter()
            .any(|asset| matches!(asset, AssetRef::Custom { .. }));
        if catalog.is_empty() || !has_custom {
            return;
        }
        let index = CatalogIndex::new(catalog);
        let pending = std::mem::take(&mut self.entries);
        for asset in pending {
            let resolved = match &asset {
                AssetRef::Custom { text } => index.lookup(text),
                AssetRef::Catalog { .. } => None,
            };
            match resolved {
                Some(id) if self.contains_catalog_id(id) => {}
                Some(id) => self.entries.push(AssetRef::catalog(id)),
                None => self.entries.push(asset),
            }
        }
    }

    /// Tagged form for persistence, in selection order.
    pub fn to_refs(&self) -> Vec<AssetRef> {
        self.entries.clone()
    }

    /// Catalog item ids, in selection order.
    pub fn catalog_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|asset| match asset {
                AssetRef::Catalog { id } => Some(id.as_str()),
                AssetRef::Custom { .. } => None,
            })
            .collect()
    }

    /// Free-text entries with no catalog match, in selection order.
    pub fn custom_entries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|asset| match asset {
                AssetRef::Custom { text } => Some(text.as_str()),
                AssetRef::Catalog { .. } => None,
            })
            .collect()
    }

    pub fn push_custom(&mut self, text: impl Into<String>) {
        self.entries.push(AssetRef::custom(text));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains_catalog_id(&self, id: &str) -> bool {
        self.entries
            .iter()
            .any(|asset| matches!(asset, AssetRef::Catalog { id: existing } if existing == id))
    }
}

/// Resolves legacy tokens straight into tagged references, keeping order.
pub fn resolve_asset_tokens<S: AsRef<str>>(
    tokens: &[S],
    catalog: &[CatalogItem],
) -> Vec<AssetRef> {
    let index = CatalogIndex::new(catalog);
    tokens
        .iter()
        .map(|token| {
            let token = token.as_ref();
            match index.lookup(token) {
                Some(id) => AssetRef::catalog(id),
                None => AssetRef::custom(token),
            }
        })
        .collect()
}

struct CatalogIndex<'a> {
    by_id: HashMap<&'a str, &'a str>,
    by_name: HashMap<&'a str, &'a str>,
}

impl<'a> CatalogIndex<'a> {
    fn new(catalog: &'a [CatalogItem]) -> Self {
        let mut by_id = HashMap::with_capacity(catalog.len());
        let mut by_name = HashMap::with_capacity(catalog.len());
        for item in catalog {
            by_id.insert(item.id.as_str(), item.id.as_str());
            // First item wins when two share a name.
            by_name.entry(item.name.as_str()).or_insert(item.id.as_str());
        }
        Self { by_id, by_name }
    }

    fn lookup(&self, token: &str) -> Option<&'a str> {
        self.by_id
            .get(token)
            .or_else(|| self.by_name.get(token))
            .copied()
    }
}
