#![allow(dead_code)]

use jobdesc_core::repo::jd_repo::StoredRoot;
use jobdesc_core::{
    AssetRef, AuditEvent, AuditSink, CatalogItem, CompetencyScore, JdForm, JdStatus, JobBand,
    JobDescriptionDraft, JobDescriptionId, JobDescriptionListQuery, JobDescriptionRoot,
    JobDescriptionStore, JobDescriptionSummary, RepoError, RepoResult, ResponsibilityCategory,
    ResponsibilityItem, RiskItem, SqliteJobDescriptionRepository,
};
use rusqlite::{params, Connection};
use std::cell::RefCell;
use std::collections::HashSet;

pub const ACTOR: &str = "user-1";

pub fn seed_catalogs(conn: &Connection) {
    let rows: &[(&str, &str, &str)] = &[
        ("locations", "loc-hq", "Head Office"),
        ("departments", "dep-eng", "Engineering"),
        ("teams", "team-core", "Core Platform"),
        ("competencies", "comm-1", "Communication"),
        ("competencies", "lead-1", "Leadership"),
        ("company_assets", "asset-laptop", "Laptop"),
        ("company_assets", "asset-phone", "Mobile Phone"),
    ];
    for (table, id, name) in rows {
        conn.execute(
            &format!("INSERT INTO {table} (id, name) VALUES (?1, ?2);"),
            params![id, name],
        )
        .unwrap();
    }
}

pub fn competency_catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("comm-1", "Communication"),
        CatalogItem::new("lead-1", "Leadership"),
    ]
}

pub fn asset_catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("asset-laptop", "Laptop"),
        CatalogItem::new("asset-phone", "Mobile Phone"),
    ]
}

/// Filled-in form: Engineer, strategic 40 / general 60, one strategic
/// responsibility, no risks, `comm-1` scored 4.
pub fn engineer_form() -> JdForm {
    let mut form = JdForm::new(&competency_catalog());
    form.position = "Engineer".to_string();
    form.job_band = Some(JobBand::Professional);
    form.job_grade = "P2".to_string();
    form.location_id = "loc-hq".to_string();
    form.department_id = "dep-eng".to_string();
    form.team_id = "team-core".to_string();
    form.direct_supervisor = "Engineering Manager".to_string();
    form.job_purpose = "Build and run the platform".to_string();
    form.set_percentage(ResponsibilityCategory::Strategic, 40);
    form.set_percentage(ResponsibilityCategory::General, 60);
    form.push_responsibility(ResponsibilityCategory::Strategic, "Plan roadmap");
    form.set_score("comm-1", Some(4));
    form
}

pub fn engineer_draft() -> JobDescriptionDraft {
    engineer_form().to_draft()
}

pub fn assets_column(conn: &Connection, id: JobDescriptionId) -> String {
    conn.query_row(
        "SELECT assets FROM job_descriptions WHERE id = ?1;",
        [id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn child_count(conn: &Connection, table: &str, id: JobDescriptionId) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE jd_id = ?1;"),
        [id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<AuditEvent>>,
}

impl AuditSink for &RecordingSink {
    fn record(&self, event: &AuditEvent) -> RepoResult<()> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

/// Audit sink that always fails.
pub struct FailingSink;

impl AuditSink for FailingSink {
    fn record(&self, _event: &AuditEvent) -> RepoResult<()> {
        Err(RepoError::InvalidData("activity log unavailable".to_string()))
    }
}

/// Store wrapper that fails the named operations and delegates the rest.
pub struct FlakyStore<'conn> {
    inner: SqliteJobDescriptionRepository<'conn>,
    failing: HashSet<&'static str>,
}

impl<'conn> FlakyStore<'conn> {
    pub fn new(conn: &'conn Connection, failing: &[&'static str]) -> Self {
        Self {
            inner: SqliteJobDescriptionRepository::new(conn),
            failing: failing.iter().copied().collect(),
        }
    }

    fn check(&self, operation: &'static str) -> RepoResult<()> {
        if self.failing.contains(operation) {
            return Err(RepoError::InvalidData(format!("injected failure: {operation}")));
        }
        Ok(())
    }
}

impl JobDescriptionStore for FlakyStore<'_> {
    fn insert_root(&self, root: &JobDescriptionRoot) -> RepoResult<JobDescriptionId> {
        self.check("insert_root")?;
        self.inner.insert_root(root)
    }

    fn update_root(&self, root: &JobDescriptionRoot) -> RepoResult<()> {
        self.check("update_root")?;
        self.inner.update_root(root)
    }

    fn set_status(
        &self,
        id: JobDescriptionId,
        status: JdStatus,
        updated_by: &str,
    ) -> RepoResult<()> {
        self.check("set_status")?;
        self.inner.set_status(id, status, updated_by)
    }

    fn set_assets(&self, id: JobDescriptionId, assets: &[AssetRef]) -> RepoResult<()> {
        self.check("set_assets")?;
        self.inner.set_assets(id, assets)
    }

    fn get_root(&self, id: JobDescriptionId) -> RepoResult<Option<StoredRoot>> {
        self.check("get_root")?;
        self.inner.get_root(id)
    }

    fn list_roots(
        &self,
        query: &JobDescriptionListQuery,
    ) -> RepoResult<Vec<JobDescriptionSummary>> {
        self.check("list_roots")?;
        self.inner.list_roots(query)
    }

    fn list_legacy_assets(&self) -> RepoResult<Vec<(JobDescriptionId, Vec<String>)>> {
        self.check("list_legacy_assets")?;
        self.inner.list_legacy_assets()
    }

    fn delete_root(&self, id: JobDescriptionId) -> RepoResult<()> {
        self.check("delete_root")?;
        self.inner.delete_root(id)
    }

    fn insert_responsibilities(
        &self,
        id: JobDescriptionId,
        items: &[ResponsibilityItem],
    ) -> RepoResult<()> {
        self.check("insert_responsibilities")?;
        self.inner.insert_responsibilities(id, items)
    }

    fn list_responsibilities(&self, id: JobDescriptionId) -> RepoResult<Vec<ResponsibilityItem>> {
        self.check("list_responsibilities")?;
        self.inner.list_responsibilities(id)
    }

    fn delete_responsibilities(&self, id: JobDescriptionId) -> RepoResult<()> {
        self.check("delete_responsibilities")?;
        self.inner.delete_responsibilities(id)
    }

    fn insert_risks(&self, id: JobDescriptionId, items: &[RiskItem]) -> RepoResult<()> {
        self.check("insert_risks")?;
        self.inner.insert_risks(id, items)
    }

    fn list_risks(&self, id: JobDescriptionId) -> RepoResult<Vec<RiskItem>> {
        self.check("list_risks")?;
        self.inner.list_risks(id)
    }

    fn delete_risks(&self, id: JobDescriptionId) -> RepoResult<()> {
        self.check("delete_risks")?;
        self.inner.delete_risks(id)
    }

    fn insert_competency_scores(
        &self,
        id: JobDescriptionId,
        scores: &[CompetencyScore],
    ) -> RepoResult<()> {
        self.check("insert_competency_scores")?;
        self.inner.insert_competency_scores(id, scores)
    }

    fn list_competency_scores(&self, id: JobDescriptionId) -> RepoResult<Vec<CompetencyScore>> {
        self.check("list_competency_scores")?;
        self.inner.list_competency_scores(id)
    }

    fn delete_competency_scores(&self, id: JobDescriptionId) -> RepoResult<()> {
        self.check("delete_competency_scores")?;
        self.inner.delete_competency_scores(id)
    }
}
