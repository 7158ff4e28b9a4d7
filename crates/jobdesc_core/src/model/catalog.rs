//! Read-only reference catalog entries.

use serde::{Deserialize, Serialize};

/// One `{id, name}` entry from an externally managed lookup list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Reference catalogs this core reads but never mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Location,
    Department,
    Team,
    Competency,
    CompanyAsset,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 5] = [
        CatalogKind::Location,
        CatalogKind::Department,
        CatalogKind::Team,
        CatalogKind::Competency,
        CatalogKind::CompanyAsset,
    ];

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Location => "locations",
            Self::Department => "departments",
            Self::Team => "teams",
            Self::Competency => "competencies",
            Self::CompanyAsset => "company_assets",
        }
    }
}
