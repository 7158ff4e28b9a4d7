//! Job description aggregate orchestration.
//!
//! # Responsibility
//! - Gate every write with the validator before the first store call.
//! - Run the non-atomic create/update/read sequences across the root table
//!   and the three child tables.
//! - Emit one audit event per successful mutation.
//!
//! # Invariants
//! - Root failures are fatal and propagated; they are never retried.
//! - Child failures follow `ChildWritePolicy` on writes and always degrade
//!   on reads. Every absorbed failure is logged and listed in the outcome.
//! - Update replaces a supplied child collection wholesale (delete, then
//!   insert); omitted collections are not touched. An absorbed delete
//!   failure skips the insert, so the old rows stay as they were.
//! - Legacy asset rows are resolved against the asset catalog before any
//!   comparison or return.
//! - Audit failures are logged and swallowed.
//! - Descriptions and other free text never reach the log.

use crate::diff::version_diff::{
    compare_with_previous as compare_snapshots, diff_versions, VersionComparison,
};
use crate::model::catalog::CatalogItem;
use crate::model::job_description::{
    CompetencyScore, JdStatus, JobBand, JobDescription, JobDescriptionDraft, JobDescriptionFields,
    JobDescriptionId, JobDescriptionRoot, JobDescriptionSummary, JobDescriptionUpdate,
};
use crate::model::validation::{RequiredField, ValidationError};
use crate::repo::audit_repo::{AuditAction, AuditEvent, AuditSink};
use crate::repo::jd_repo::{JobDescriptionListQuery, JobDescriptionStore, RepoError, RepoResult};
use crate::resolver::asset_resolver::resolve_asset_tokens;
use log::{debug, info, warn};
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Owned child collections of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildCollection {
    Responsibilities,
    Risks,
    CompetencyScores,
}

impl ChildCollection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Responsibilities => "responsibilities",
            Self::Risks => "risks",
            Self::CompetencyScores => "competency_scores",
        }
    }
}

/// Store call that failed on a child collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOperation {
    Read,
    Delete,
    Insert,
}

impl ChildOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Delete => "delete",
            Self::Insert => "insert",
        }
    }
}

/// How child-collection write failures are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChildWritePolicy {
    /// Log, record in the outcome, and report success.
    #[default]
    Absorb,
    /// Stop and fail. A failed create also deletes its root row (children
    /// go with it through the cascade); a failed update cannot restore the
    /// rows it already deleted.
    Strict,
}

impl ChildWritePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absorb => "absorb",
            Self::Strict => "strict",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "absorb" => Some(Self::Absorb),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// One absorbed child-collection failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildFailure {
    pub collection: ChildCollection,
    pub operation: ChildOperation,
    pub message: String,
}

/// Result of a create/update: the aggregate id plus absorbed failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub id: JobDescriptionId,
    pub degraded: Vec<ChildFailure>,
}

impl WriteOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Result of a read: the assembled aggregate plus absorbed failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub aggregate: JobDescription,
    pub degraded: Vec<ChildFailure>,
}

impl LoadOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for job description use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Submission refused before any store call.
    Validation(ValidationError),
    /// Root record does not exist.
    NotFound(JobDescriptionId),
    /// Root read/write failure.
    Repo(RepoError),
    /// `Strict` refused to copy a source whose children did not load.
    DegradedSource {
        id: JobDescriptionId,
        failure: ChildFailure,
    },
    /// Child collection failure under `ChildWritePolicy::Strict`.
    ChildCollection {
        id: JobDescriptionId,
        collection: ChildCollection,
        operation: ChildOperation,
        source: RepoError,
    },
    /// An operation needs a catalog snapshot that has not been supplied.
    CatalogUnavailable(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "job description not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::ChildCollection {
                id,
                collection,
                operation,
                source,
            } => write!(
                f,
                "failed to {} {} of job description {id}: {source}",
                operation.as_str(),
                collection.as_str()
            ),
            Self::DegradedSource { id, failure } => write!(
                f,
                "job description {id} loaded incomplete ({} {} failed: {})",
                failure.collection.as_str(),
                failure.operation.as_str(),
                failure.message
            ),
            Self::CatalogUnavailable(catalog) => {
                write!(f, "{catalog} catalog is not loaded")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ChildCollection { source, .. } => Some(source),
            Self::NotFound(_) | Self::DegradedSource { .. } | Self::CatalogUnavailable(_) => {
                None
            }
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Orchestrator over a job description store and an audit sink.
pub struct JobDescriptionService<S: JobDescriptionStore, A: AuditSink> {
    store: S,
    audit: A,
    policy: ChildWritePolicy,
    asset_catalog: Vec<CatalogItem>,
}

impl<S: JobDescriptionStore, A: AuditSink> JobDescriptionService<S, A> {
    pub fn new(store: S, audit: A) -> Self {
        Self {
            store,
            audit,
            policy: ChildWritePolicy::default(),
            asset_catalog: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: ChildWritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Asset catalog snapshot used to resolve legacy untagged asset rows.
    pub fn with_asset_catalog(mut self, catalog: Vec<CatalogItem>) -> Self {
        self.asset_catalog = catalog;
        self
    }

    pub fn policy(&self) -> ChildWritePolicy {
        self.policy
    }

    /// Creates a new aggregate (version 1, draft).
    ///
    /// Root insert failure is fatal; child failures follow the policy.
    pub fn create(
        &self,
        actor: &str,
        draft: &JobDescriptionDraft,
    ) -> ServiceResult<WriteOutcome> {
        self.create_with_lineage(actor, draft, 1, None)
    }

    /// Assembles one aggregate. A missing root is `NotFound`; child read
    /// failures leave that list empty and are reported in the outcome.
    pub fn load(&self, id: JobDescriptionId) -> ServiceResult<LoadOutcome> {
        let root = self.resolved_root(id)?;

        let mut degraded = Vec::new();
        let responsibilities = self.read_child(
            id,
            ChildCollection::Responsibilities,
            self.store.list_responsibilities(id),
            &mut degraded,
        );
        let risks = self.read_child(
            id,
            ChildCollection::Risks,
            self.store.list_risks(id),
            &mut degraded,
        );
        let competencies = self.read_child(
            id,
            ChildCollection::CompetencyScores,
            self.store.list_competency_scores(id),
            &mut degraded,
        );

        Ok(LoadOutcome {
            aggregate: JobDescription {
                root,
                responsibilities,
                risks,
                competencies,
            },
            degraded,
        })
    }

    /// Assembled aggregate without the failure report.
    pub fn get(&self, id: JobDescriptionId) -> ServiceResult<JobDescription> {
        Ok(self.load(id)?.aggregate)
    }

    /// Updates root fields and replaces each supplied child collection.
    pub fn update(
        &self,
        actor: &str,
        id: JobDescriptionId,
        update: &JobDescriptionUpdate,
    ) -> ServiceResult<WriteOutcome> {
        let started_at = Instant::now();
        update.validate()?;

        let before = self.resolved_root(id)?;
        let mut root = with_fields(before.clone(), &update.fields)?;
        root.updated_by = actor.to_string();
        self.store.update_root(&root)?;

        let mut degraded = Vec::new();
        let mut replaced = Vec::new();
        if let Some(items) = update.responsibilities.as_ref() {
            if self.replace_child(
                id,
                ChildCollection::Responsibilities,
                &mut degraded,
                || self.store.delete_responsibilities(id),
                || self.store.insert_responsibilities(id, items),
            )? {
                replaced.push(ChildCollection::Responsibilities.as_str());
            }
        }
        if let Some(items) = update.risks.as_ref() {
            if self.replace_child(
                id,
                ChildCollection::Risks,
                &mut degraded,
                || self.store.delete_risks(id),
                || self.store.insert_risks(id, items),
            )? {
                replaced.push(ChildCollection::Risks.as_str());
            }
        }
        if let Some(scores) = update.competencies.as_ref() {
            let scores = without_joined_names(scores);
            if self.replace_child(
                id,
                ChildCollection::CompetencyScores,
                &mut degraded,
                || self.store.delete_competency_scores(id),
                || self.store.insert_competency_scores(id, &scores),
            )? {
                replaced.push(ChildCollection::CompetencyScores.as_str());
            }
        }

        let changed_fields =
            diff_versions(&root_only(&before), &root_only(&root)).changed_names();
        info!(
            "event=jd_update module=service status=ok jd_id={id} changed_fields={} replaced={} degraded={} duration_ms={}",
            changed_fields.len(),
            replaced.len(),
            degraded.len(),
            started_at.elapsed().as_millis()
        );
        self.emit(
            AuditEvent::job_description(
                actor,
                AuditAction::Update,
                id,
                format!("Updated job description \"{}\"", root.position),
            )
            .with_metadata("changed_fields", json!(changed_fields))
            .with_metadata("replaced_collections", json!(replaced))
            .with_metadata("degraded", json!(failure_names(&degraded))),
        );

        Ok(WriteOutcome { id, degraded })
    }

    /// Deletes the root row; child rows go through the store's cascade.
    pub fn delete(&self, actor: &str, id: JobDescriptionId) -> ServiceResult<()> {
        let position = self
            .store
            .get_root(id)?
            .map(|stored| stored.root.position)
            .ok_or(ServiceError::NotFound(id))?;
        self.store.delete_root(id)?;

        info!("event=jd_delete module=service status=ok jd_id={id}");
        self.emit(AuditEvent::job_description(
            actor,
            AuditAction::Delete,
            id,
            format!("Deleted job description \"{position}\""),
        ));
        Ok(())
    }

    /// Lists root rows with joined lookup names; children are not loaded.
    pub fn list(
        &self,
        query: &JobDescriptionListQuery,
    ) -> ServiceResult<Vec<JobDescriptionSummary>> {
        Ok(self.store.list_roots(query)?)
    }

    pub fn publish(&self, actor: &str, id: JobDescriptionId) -> ServiceResult<()> {
        self.transition(actor, id, JdStatus::Published, AuditAction::Publish)
    }

    pub fn archive(&self, actor: &str, id: JobDescriptionId) -> ServiceResult<()> {
        self.transition(actor, id, JdStatus::Archived, AuditAction::Archive)
    }

    /// Copies `id` into a new draft with `version + 1` linked to `id`.
    ///
    /// Under `Strict`, a source with unreadable children is refused rather
    /// than copied incomplete.
    pub fn create_next_version(
        &self,
        actor: &str,
        id: JobDescriptionId,
    ) -> ServiceResult<WriteOutcome> {
        let source = self.load(id)?;
        if self.policy == ChildWritePolicy::Strict {
            if let Some(failure) = source.degraded.into_iter().next() {
                return Err(ServiceError::DegradedSource { id, failure });
            }
        }

        let aggregate = source.aggregate;
        let draft = JobDescriptionDraft {
            fields: aggregate.fields(),
            responsibilities: aggregate.responsibilities,
            risks: aggregate.risks,
            competencies: without_joined_names(&aggregate.competencies),
        };
        let next_version = aggregate.root.version.saturating_add(1);
        self.create_with_lineage(actor, &draft, next_version, Some(id))
    }

    /// Loads `id` and its `parent_version_id` target and compares them.
    ///
    /// A predecessor that is unset or cannot be loaded yields
    /// `VersionComparison::NoPreviousVersion`.
    pub fn compare_with_previous(
        &self,
        id: JobDescriptionId,
    ) -> ServiceResult<VersionComparison> {
        let current = self.get(id)?;
        let Some(parent_id) = current.root.parent_version_id else {
            return Ok(VersionComparison::NoPreviousVersion);
        };

        let previous = match self.load(parent_id) {
            Ok(outcome) => Some(outcome.aggregate),
            Err(err) => {
                warn!(
                    "event=jd_compare module=service status=degraded jd_id={id} parent_id={parent_id} error={err}"
                );
                None
            }
        };
        Ok(compare_snapshots(&current, previous.as_ref()))
    }

    /// Rewrites every legacy untagged asset row in tagged form.
    ///
    /// Returns the number of rows rewritten. Refuses to run without an
    /// asset catalog, since every token would otherwise become custom text.
    pub fn migrate_legacy_assets(&self) -> ServiceResult<usize> {
        let legacy = self.store.list_legacy_assets()?;
        if legacy.is_empty() {
            return Ok(0);
        }
        if self.asset_catalog.is_empty() {
            return Err(ServiceError::CatalogUnavailable("company asset"));
        }

        for (id, tokens) in &legacy {
            let refs = resolve_asset_tokens(tokens, &self.asset_catalog);
            self.store.set_assets(*id, &refs)?;
        }
        info!(
            "event=legacy_assets_migrated module=service status=ok rows={}",
            legacy.len()
        );
        Ok(legacy.len())
    }

    fn create_with_lineage(
        &self,
        actor: &str,
        draft: &JobDescriptionDraft,
        version: u32,
        parent_version_id: Option<JobDescriptionId>,
    ) -> ServiceResult<WriteOutcome> {
        let started_at = Instant::now();
        draft.validate()?;

        let fields = &draft.fields;
        let root = JobDescriptionRoot {
            id: Uuid::new_v4(),
            position: fields.position.trim().to_string(),
            job_band: required_band(fields)?,
            job_grade: fields.job_grade.trim().to_string(),
            location_id: fields.location_id.clone(),
            department_id: fields.department_id.clone(),
            team_id: fields.team_id.clone(),
            direct_supervisor: fields.direct_supervisor.trim().to_string(),
            job_purpose: fields.job_purpose.clone(),
            status: JdStatus::Draft,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            version,
            parent_version_id,
            assets: fields.assets.clone(),
            responsibility_percentages: fields.responsibility_percentages.clone(),
            created_at: 0,
            updated_at: 0,
        };

        let id = self.store.insert_root(&root).map_err(|err| {
            warn!("event=jd_create module=service status=error stage=root error={err}");
            err
        })?;

        let mut degraded = Vec::new();
        if let Err(err) = self.insert_children(id, draft, &mut degraded) {
            self.compensate_create(id);
            return Err(err);
        }

        info!(
            "event=jd_create module=service status=ok jd_id={id} version={version} responsibilities={} risks={} competencies={} degraded={} duration_ms={}",
            draft.responsibilities.len(),
            draft.risks.len(),
            draft.competencies.len(),
            degraded.len(),
            started_at.elapsed().as_millis()
        );
        let mut event = AuditEvent::job_description(
            actor,
            AuditAction::Create,
            id,
            format!("Created job description \"{}\"", root.position),
        )
        .with_metadata("version", json!(version))
        .with_metadata("degraded", json!(failure_names(&degraded)));
        if let Some(parent_id) = parent_version_id {
            event = event.with_metadata("parent_version_id", json!(parent_id.to_string()));
        }
        self.emit(event);

        Ok(WriteOutcome { id, degraded })
    }

    fn insert_children(
        &self,
        id: JobDescriptionId,
        draft: &JobDescriptionDraft,
        degraded: &mut Vec<ChildFailure>,
    ) -> ServiceResult<()> {
        self.write_child(
            id,
            ChildCollection::Responsibilities,
            ChildOperation::Insert,
            self.store.insert_responsibilities(id, &draft.responsibilities),
            degraded,
        )?;
        self.write_child(
            id,
            ChildCollection::Risks,
            ChildOperation::Insert,
            self.store.insert_risks(id, &draft.risks),
            degraded,
        )?;
        if !draft.competencies.is_empty() {
            let scores = without_joined_names(&draft.competencies);
            self.write_child(
                id,
                ChildCollection::CompetencyScores,
                ChildOperation::Insert,
                self.store.insert_competency_scores(id, &scores),
                degraded,
            )?;
        }
        Ok(())
    }

    fn compensate_create(&self, id: JobDescriptionId) {
        match self.store.delete_root(id) {
            Ok(()) => warn!("event=jd_create module=service status=rolled_back jd_id={id}"),
            Err(err) => warn!(
                "event=jd_create module=service status=rollback_failed jd_id={id} error={err}"
            ),
        }
    }

    /// Deletes then inserts one collection. Returns `true` only when both
    /// steps succeeded. A failed delete skips the insert so old rows are
    /// never doubled.
    fn replace_child(
        &self,
        id: JobDescriptionId,
        collection: ChildCollection,
        degraded: &mut Vec<ChildFailure>,
        delete: impl FnOnce() -> RepoResult<()>,
        insert: impl FnOnce() -> RepoResult<()>,
    ) -> ServiceResult<bool> {
        let deleted = delete();
        let delete_ok = deleted.is_ok();
        self.write_child(id, collection, ChildOperation::Delete, deleted, degraded)?;
        if !delete_ok {
            debug!(
                "event=child_replace module=service status=skipped jd_id={id} collection={}",
                collection.as_str()
            );
            return Ok(false);
        }

        let inserted = insert();
        let insert_ok = inserted.is_ok();
        self.write_child(id, collection, ChildOperation::Insert, inserted, degraded)?;
        Ok(insert_ok)
    }

    /// Root row with legacy asset tokens resolved against the catalog.
    fn resolved_root(&self, id: JobDescriptionId) -> ServiceResult<JobDescriptionRoot> {
        let stored = self.store.get_root(id)?.ok_or(ServiceError::NotFound(id))?;
        let mut root = stored.root;
        if let Some(tokens) = stored.legacy_asset_tokens {
            debug!(
                "event=legacy_assets_resolved module=service jd_id={id} tokens={} catalog_size={}",
                tokens.len(),
                self.asset_catalog.len()
            );
            root.assets = resolve_asset_tokens(&tokens, &self.asset_catalog);
        }
        Ok(root)
    }

    fn write_child(
        &self,
        id: JobDescriptionId,
        collection: ChildCollection,
        operation: ChildOperation,
        result: RepoResult<()>,
        degraded: &mut Vec<ChildFailure>,
    ) -> ServiceResult<()> {
        let Err(err) = result else {
            return Ok(());
        };
        warn!(
            "event=child_write module=service status=error policy={} jd_id={id} collection={} operation={} error={err}",
            self.policy.as_str(),
            collection.as_str(),
            operation.as_str()
        );
        match self.policy {
            ChildWritePolicy::Absorb => {
                degraded.push(ChildFailure {
                    collection,
                    operation,
                    message: err.to_string(),
                });
                Ok(())
            }
            ChildWritePolicy::Strict => Err(ServiceError::ChildCollection {
                id,
                collection,
                operation,
                source: err,
            }),
        }
    }

    fn read_child<T>(
        &self,
        id: JobDescriptionId,
        collection: ChildCollection,
        result: RepoResult<Vec<T>>,
        degraded: &mut Vec<ChildFailure>,
    ) -> Vec<T> {
        match result {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    "event=child_read module=service status=degraded jd_id={id} collection={} error={err}",
                    collection.as_str()
                );
                degraded.push(ChildFailure {
                    collection,
                    operation: ChildOperation::Read,
                    message: err.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn transition(
        &self,
        actor: &str,
        id: JobDescriptionId,
        status: JdStatus,
        action: AuditAction,
    ) -> ServiceResult<()> {
        let position = self
            .store
            .get_root(id)?
            .map(|stored| stored.root.position)
            .ok_or(ServiceError::NotFound(id))?;
        self.store.set_status(id, status, actor)?;

        info!(
            "event=jd_status module=service status=ok jd_id={id} new_status={}",
            status.as_str()
        );
        self.emit(
            AuditEvent::job_description(
                actor,
                action,
                id,
                format!("Set job description \"{position}\" to {}", status.as_str()),
            )
            .with_metadata("status", json!(status.as_str())),
        );
        Ok(())
    }

    fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.record(&event) {
            warn!(
                "event=audit_emit module=service status=error action={} entity_id={} error={err}",
                event.action.as_str(),
                event.entity_id
            );
        }
    }
}

fn required_band(fields: &JobDescriptionFields) -> Result<JobBand, ValidationError> {
    fields
        .job_band
        .ok_or(ValidationError::MissingField(RequiredField::JobBand))
}

/// Copies editable fields onto a root, normalizing surrounding whitespace.
fn with_fields(
    mut root: JobDescriptionRoot,
    fields: &JobDescriptionFields,
) -> ServiceResult<JobDescriptionRoot> {
    root.position = fields.position.trim().to_string();
    root.job_band = required_band(fields)?;
    root.job_grade = fields.job_grade.trim().to_string();
    root.location_id = fields.location_id.clone();
    root.department_id = fields.department_id.clone();
    root.team_id = fields.team_id.clone();
    root.direct_supervisor = fields.direct_supervisor.trim().to_string();
    root.job_purpose = fields.job_purpose.clone();
    root.assets = fields.assets.clone();
    root.responsibility_percentages = fields.responsibility_percentages.clone();
    Ok(root)
}

fn root_only(root: &JobDescriptionRoot) -> JobDescription {
    JobDescription {
        root: root.clone(),
        responsibilities: Vec::new(),
        risks: Vec::new(),
        competencies: Vec::new(),
    }
}

fn without_joined_names(scores: &[CompetencyScore]) -> Vec<CompetencyScore> {
    scores
        .iter()
        .map(|score| CompetencyScore {
            competency_name: None,
            ..score.clone()
        })
        .collect()
}

fn failure_names(failures: &[ChildFailure]) -> Vec<String> {
    failures
        .iter()
        .map(|failure| format!("{}:{}", failure.collection.as_str(), failure.operation.as_str()))
        .collect()
}
