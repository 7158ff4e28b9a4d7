//! Core domain logic for job description records.
//! This crate is the single source of truth for aggregate invariants and the
//! persistence protocol across the root record and its child collections.

pub mod codec;
pub mod config;
pub mod db;
pub mod diff;
pub mod logging;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod service;

pub use codec::form::{CompetencyEntry, JdForm, RiskRow};
pub use config::{ConfigError, CoreConfig};
pub use diff::version_diff::{
    diff_versions, DiffField, DiffList, FieldChange, ListComparison, VersionComparison,
    VersionDiff,
};
pub use logging::{init_logging, init_logging_from_config, logging_status, LogLevel, LoggingError};
pub use model::asset::{AssetRef, StoredAssets};
pub use model::catalog::{CatalogItem, CatalogKind};
pub use model::job_description::{
    CompetencyScore, JdStatus, JobBand, JobDescription, JobDescriptionDraft, JobDescriptionFields,
    JobDescriptionId, JobDescriptionRoot, JobDescriptionSummary, JobDescriptionUpdate,
    ResponsibilityCategory, ResponsibilityItem, RiskItem, RiskLevel, RiskType,
};
pub use model::percentages::ResponsibilityPercentages;
pub use model::validation::{RequiredField, ValidationError};
pub use repo::audit_repo::{AuditAction, AuditEvent, AuditSink, NoopAuditSink, SqliteAuditSink};
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::jd_repo::{
    JobDescriptionListQuery, JobDescriptionStore, RepoError, RepoResult,
    SqliteJobDescriptionRepository, StoredRoot,
};
pub use resolver::asset_resolver::{resolve_asset_tokens, AssetSelection};
pub use service::jd_service::{
    ChildCollection, ChildFailure, ChildOperation, ChildWritePolicy, JobDescriptionService,
    LoadOutcome, ServiceError, ServiceResult, WriteOutcome,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
