//! Job description store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide independent CRUD calls over the root table and the three child
//!   tables (`jd_responsibilities`, `jd_risks`, `jd_competency_scores`).
//! - Keep SQL and column encodings inside the persistence boundary.
//!
//! # Invariants
//! - Each method is one independent store call. A multi-row child insert is
//!   atomic for that table only.
//! - Child reads are ordered by `order_index ASC, id ASC`.
//! - Child rows with an unknown category/type are skipped on read; an unknown
//!   risk level falls back to the default level.
//! - Root deletion relies on `ON DELETE CASCADE` for child cleanup.

use crate::db::DbError;
use crate::model::asset::{AssetRef, StoredAssets};
use crate::model::job_description::{
    CompetencyScore, JdStatus, JobBand, JobDescriptionId, JobDescriptionRoot,
    JobDescriptionSummary, ResponsibilityCategory, ResponsibilityItem, RiskItem, RiskLevel,
    RiskType,
};
use crate::model::percentages::ResponsibilityPercentages;
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ROOT_SELECT_SQL: &str = "SELECT
    id,
    position,
    job_band,
    job_grade,
    location_id,
    department_id,
    team_id,
    direct_supervisor,
    job_purpose,
    status,
    created_by,
    updated_by,
    version,
    parent_version_id,
    assets,
    responsibility_percentages,
    created_at,
    updated_at
FROM job_descriptions";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for job description persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(JobDescriptionId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "job description not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted job description data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Root row as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRoot {
    /// Decoded root. `root.assets` is empty when the row is legacy.
    pub root: JobDescriptionRoot,
    /// Untagged tokens from rows written before assets were tagged.
    pub legacy_asset_tokens: Option<Vec<String>>,
}

/// Query options for list views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDescriptionListQuery {
    pub status: Option<JdStatus>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Per-table store calls used by the orchestrator.
///
/// No method spans the root and a child table.
pub trait JobDescriptionStore {
    /// Inserts the root row; timestamps are assigned by storage.
    fn insert_root(&self, root: &JobDescriptionRoot) -> RepoResult<JobDescriptionId>;
    /// Overwrites the editable root columns plus `updated_by`. Status,
    /// version, lineage and `created_*` are left as stored.
    fn update_root(&self, root: &JobDescriptionRoot) -> RepoResult<()>;
    fn set_status(&self, id: JobDescriptionId, status: JdStatus, updated_by: &str)
        -> RepoResult<()>;
    fn set_assets(&self, id: JobDescriptionId, assets: &[AssetRef]) -> RepoResult<()>;
    fn get_root(&self, id: JobDescriptionId) -> RepoResult<Option<StoredRoot>>;
    fn list_roots(&self, query: &JobDescriptionListQuery)
        -> RepoResult<Vec<JobDescriptionSummary>>;
    /// Ids and tokens of every row whose assets are still untagged.
    fn list_legacy_assets(&self) -> RepoResult<Vec<(JobDescriptionId, Vec<String>)>>;
    fn delete_root(&self, id: JobDescriptionId) -> RepoResult<()>;

    fn insert_responsibilities(
        &self,
        id: JobDescriptionId,
        items: &[ResponsibilityItem],
    ) -> RepoResult<()>;
    fn list_responsibilities(&self, id: JobDescriptionId) -> RepoResult<Vec<ResponsibilityItem>>;
    fn delete_responsibilities(&self, id: JobDescriptionId) -> RepoResult<()>;

    fn insert_risks(&self, id: JobDescriptionId, items: &[RiskItem]) -> RepoResult<()>;
    fn list_risks(&self, id: JobDescriptionId) -> RepoResult<Vec<RiskItem>>;
    fn delete_risks(&self, id: JobDescriptionId) -> RepoResult<()>;

    fn insert_competency_scores(
        &self,
        id: JobDescriptionId,
        scores: &[CompetencyScore],
    ) -> RepoResult<()>;
    /// Scores joined with competency names from the catalog.
    fn list_competency_scores(&self, id: JobDescriptionId) -> RepoResult<Vec<CompetencyScore>>;
    fn delete_competency_scores(&self, id: JobDescriptionId) -> RepoResult<()>;
}

/// SQLite-backed job description store.
pub struct SqliteJobDescriptionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteJobDescriptionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl JobDescriptionStore for SqliteJobDescriptionRepository<'_> {
    fn insert_root(&self, root: &JobDescriptionRoot) -> RepoResult<JobDescriptionId> {
        self.conn.execute(
            "INSERT INTO job_descriptions (
                id,
                position,
                job_band,
                job_grade,
                location_id,
                department_id,
                team_id,
                direct_supervisor,
                job_purpose,
                status,
                created_by,
                updated_by,
                version,
                parent_version_id,
                assets,
                responsibility_percentages
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            params![
                root.id.to_string(),
                root.position.as_str(),
                root.job_band.as_str(),
                root.job_grade.as_str(),
                root.location_id.as_str(),
                root.department_id.as_str(),
                root.team_id.as_str(),
                root.direct_supervisor.as_str(),
                root.job_purpose.as_str(),
                root.status.as_str(),
                root.created_by.as_str(),
                root.updated_by.as_str(),
                root.version,
                root.parent_version_id.map(|id| id.to_string()),
                encode_assets(&root.assets)?,
                encode_percentages(&root.responsibility_percentages)?,
            ],
        )?;

        Ok(root.id)
    }

    fn update_root(&self, root: &JobDescriptionRoot) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE job_descriptions
             SET
                position = ?1,
                job_band = ?2,
                job_grade = ?3,
                location_id = ?4,
                department_id = ?5,
                team_id = ?6,
                direct_supervisor = ?7,
                job_purpose = ?8,
                assets = ?9,
                responsibility_percentages = ?10,
                updated_by = ?11,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?12;",
            params![
                root.position.as_str(),
                root.job_band.as_str(),
                root.job_grade.as_str(),
                root.location_id.as_str(),
                root.department_id.as_str(),
                root.team_id.as_str(),
                root.direct_supervisor.as_str(),
                root.job_purpose.as_str(),
                encode_assets(&root.assets)?,
                encode_percentages(&root.responsibility_percentages)?,
                root.updated_by.as_str(),
                root.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(root.id));
        }

        Ok(())
    }

    fn set_status(
        &self,
        id: JobDescriptionId,
        status: JdStatus,
        updated_by: &str,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE job_descriptions
             SET
                status = ?1,
                updated_by = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3;",
            params![status.as_str(), updated_by, id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn set_assets(&self, id: JobDescriptionId, assets: &[AssetRef]) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE job_descriptions SET assets = ?1 WHERE id = ?2;",
            params![encode_assets(assets)?, id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_root(&self, id: JobDescriptionId) -> RepoResult<Option<StoredRoot>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ROOT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_root_row(row)?));
        }

        Ok(None)
    }

    fn list_roots(
        &self,
        query: &JobDescriptionListQuery,
    ) -> RepoResult<Vec<JobDescriptionSummary>> {
        let mut sql = String::from(
            "SELECT
                jd.id,
                jd.position,
                jd.job_band,
                jd.job_grade,
                jd.status,
                jd.version,
                jd.parent_version_id,
                jd.updated_at,
                l.name AS location_name,
                d.name AS department_name,
                t.name AS team_name
             FROM job_descriptions jd
             LEFT JOIN locations l ON l.id = jd.location_id
             LEFT JOIN departments d ON d.id = jd.department_id
             LEFT JOIN teams t ON t.id = jd.team_id
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND jd.status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        sql.push_str(" ORDER BY jd.updated_at DESC, jd.id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(JobDescriptionSummary {
                id: parse_uuid(&row.get::<_, String>("id")?, "job_descriptions.id")?,
                position: row.get("position")?,
                job_band: parse_band(&row.get::<_, String>("job_band")?)?,
                job_grade: row.get("job_grade")?,
                status: parse_status(&row.get::<_, String>("status")?)?,
                version: row.get("version")?,
                parent_version_id: parse_optional_uuid(
                    row.get("parent_version_id")?,
                    "job_descriptions.parent_version_id",
                )?,
                location_name: row.get("location_name")?,
                department_name: row.get("department_name")?,
                team_name: row.get("team_name")?,
                updated_at: row.get("updated_at")?,
            });
        }

        Ok(summaries)
    }

    fn list_legacy_assets(&self) -> RepoResult<Vec<(JobDescriptionId, Vec<String>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, assets FROM job_descriptions ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut legacy = Vec::new();
        while let Some(row) = rows.next()? {
            let id = parse_uuid(&row.get::<_, String>("id")?, "job_descriptions.id")?;
            if let StoredAssets::Legacy(tokens) = decode_assets(&row.get::<_, String>("assets")?)? {
                legacy.push((id, tokens));
            }
        }
        Ok(legacy)
    }

    fn delete_root(&self, id: JobDescriptionId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM job_descriptions WHERE id = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn insert_responsibilities(
        &self,
        id: JobDescriptionId,
        items: &[ResponsibilityItem],
    ) -> RepoResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let jd_id = id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO jd_responsibilities (jd_id, category, description, order_index)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for item in items {
                stmt.execute(params![
                    jd_id.as_str(),
                    item.category.as_str(),
                    item.description.as_str(),
                    item.order_index,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_responsibilities(&self, id: JobDescriptionId) -> RepoResult<Vec<ResponsibilityItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, description, order_index
             FROM jd_responsibilities
             WHERE jd_id = ?1
             ORDER BY order_index ASC, id ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let category_text: String = row.get("category")?;
            let Some(category) = ResponsibilityCategory::parse(&category_text) else {
                warn!(
                    "event=child_row_skipped module=repo table=jd_responsibilities jd_id={id} reason=unknown_category value={category_text}"
                );
                continue;
            };
            items.push(ResponsibilityItem {
                category,
                description: row.get("description")?,
                order_index: row.get("order_index")?,
            });
        }
        Ok(items)
    }

    fn delete_responsibilities(&self, id: JobDescriptionId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM jd_responsibilities WHERE jd_id = ?1;",
            [id.to_string()],
        )?;
        Ok(())
    }

    fn insert_risks(&self, id: JobDescriptionId, items: &[RiskItem]) -> RepoResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let jd_id = id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO jd_risks (jd_id, risk_type, description, risk_level, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for item in items {
                stmt.execute(params![
                    jd_id.as_str(),
                    item.risk_type.as_str(),
                    item.description.as_str(),
                    item.risk_level.as_str(),
                    item.order_index,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_risks(&self, id: JobDescriptionId) -> RepoResult<Vec<RiskItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT risk_type, description, risk_level, order_index
             FROM jd_risks
             WHERE jd_id = ?1
             ORDER BY order_index ASC, id ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let type_text: String = row.get("risk_type")?;
            let Some(risk_type) = RiskType::parse(&type_text) else {
                warn!(
                    "event=child_row_skipped module=repo table=jd_risks jd_id={id} reason=unknown_type value={type_text}"
                );
                continue;
            };
            let risk_level = row
                .get::<_, Option<String>>("risk_level")?
                .and_then(|value| RiskLevel::parse(&value))
                .unwrap_or_default();
            items.push(RiskItem {
                risk_type,
                description: row.get("description")?,
                risk_level,
                order_index: row.get("order_index")?,
            });
        }
        Ok(items)
    }

    fn delete_risks(&self, id: JobDescriptionId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM jd_risks WHERE jd_id = ?1;", [id.to_string()])?;
        Ok(())
    }

    fn insert_competency_scores(
        &self,
        id: JobDescriptionId,
        scores: &[CompetencyScore],
    ) -> RepoResult<()> {
        if scores.is_empty() {
            return Ok(());
        }
        let jd_id = id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO jd_competency_scores (jd_id, competency_id, score, notes)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for score in scores {
                stmt.execute(params![
                    jd_id.as_str(),
                    score.competency_id.as_str(),
                    score.score,
                    score.notes.as_deref(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_competency_scores(&self, id: JobDescriptionId) -> RepoResult<Vec<CompetencyScore>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.competency_id, c.name AS competency_name, s.score, s.notes
             FROM jd_competency_scores s
             LEFT JOIN competencies c ON c.id = s.competency_id
             WHERE s.jd_id = ?1
             ORDER BY s.id ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut scores = Vec::new();
        while let Some(row) = rows.next()? {
            scores.push(CompetencyScore {
                competency_id: row.get("competency_id")?,
                competency_name: row.get("competency_name")?,
                score: row.get("score")?,
                notes: row.get("notes")?,
            });
        }
        Ok(scores)
    }

    fn delete_competency_scores(&self, id: JobDescriptionId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM jd_competency_scores WHERE jd_id = ?1;",
            [id.to_string()],
        )?;
        Ok(())
    }
}

fn parse_root_row(row: &Row<'_>) -> RepoResult<StoredRoot> {
    let id = parse_uuid(&row.get::<_, String>("id")?, "job_descriptions.id")?;
    let percentages_text: String = row.get("responsibility_percentages")?;
    let responsibility_percentages: ResponsibilityPercentages =
        serde_json::from_str(&percentages_text).map_err(|err| {
            RepoError::InvalidData(format!(
                "invalid responsibility_percentages for {id}: {err}"
            ))
        })?;

    let (assets, legacy_asset_tokens) = match decode_assets(&row.get::<_, String>("assets")?)? {
        StoredAssets::Tagged(refs) => (refs, None),
        StoredAssets::Legacy(tokens) => (Vec::new(), Some(tokens)),
    };

    let root = JobDescriptionRoot {
        id,
        position: row.get("position")?,
        job_band: parse_band(&row.get::<_, String>("job_band")?)?,
        job_grade: row.get("job_grade")?,
        location_id: row.get("location_id")?,
        department_id: row.get("department_id")?,
        team_id: row.get("team_id")?,
        direct_supervisor: row.get("direct_supervisor")?,
        job_purpose: row.get("job_purpose")?,
        status: parse_status(&row.get::<_, String>("status")?)?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        version: row.get("version")?,
        parent_version_id: parse_optional_uuid(
            row.get("parent_version_id")?,
            "job_descriptions.parent_version_id",
        )?,
        assets,
        // Missing keys in older rows read as 0 through `from_pairs`.
        responsibility_percentages: ResponsibilityPercentages::from_pairs(
            responsibility_percentages.iter(),
        ),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };

    Ok(StoredRoot {
        root,
        legacy_asset_tokens,
    })
}

fn encode_assets(assets: &[AssetRef]) -> RepoResult<String> {
    StoredAssets::encode(assets)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode assets: {err}")))
}

fn decode_assets(raw: &str) -> RepoResult<StoredAssets> {
    StoredAssets::decode(raw)
        .map_err(|err| RepoError::InvalidData(format!("invalid assets column `{raw}`: {err}")))
}

fn encode_percentages(value: &ResponsibilityPercentages) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|err| {
        RepoError::InvalidData(format!("cannot encode responsibility percentages: {err}"))
    })
}

fn parse_band(value: &str) -> RepoResult<JobBand> {
    JobBand::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid job band `{value}` in job_descriptions.job_band"
        ))
    })
}

fn parse_status(value: &str) -> RepoResult<JdStatus> {
    JdStatus::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{value}` in job_descriptions.status"))
    })
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<JobDescriptionId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_optional_uuid(
    value: Option<String>,
    column: &str,
) -> RepoResult<Option<JobDescriptionId>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}
