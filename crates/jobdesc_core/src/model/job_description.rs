//! Job description aggregate model.
//!
//! # Responsibility
//! - Define the root record and its three owned child collections.
//! - Define the closed vocabularies (band, grade, status, categories, risk
//!   type/level) and their stable storage keys.
//!
//! # Invariants
//! - `version` is positive; `parent_version_id` points at the immediate
//!   predecessor or is `None` for a first version.
//! - Persisted competency scores are always in `1..=5`; an unscored
//!   competency is absent rather than stored as `0`.
//! - Child items carry an `order_index` and no identity of their own.

use crate::model::asset::AssetRef;
use crate::model::percentages::ResponsibilityPercentages;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one job description version (root record).
pub type JobDescriptionId = Uuid;

/// Lowest score that is persisted. `0` means "not scored".
pub const MIN_PERSISTED_SCORE: u8 = 1;
/// Highest competency score.
pub const MAX_SCORE: u8 = 5;

/// Organizational job band. Each band owns its own grade ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobBand {
    Executive,
    Managerial,
    Supervisory,
    Professional,
    Operational,
}

impl JobBand {
    pub const ALL: [JobBand; 5] = [
        JobBand::Executive,
        JobBand::Managerial,
        JobBand::Supervisory,
        JobBand::Professional,
        JobBand::Operational,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::Managerial => "managerial",
            Self::Supervisory => "supervisory",
            Self::Professional => "professional",
            Self::Operational => "operational",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "executive" => Some(Self::Executive),
            "managerial" => Some(Self::Managerial),
            "supervisory" => Some(Self::Supervisory),
            "professional" => Some(Self::Professional),
            "operational" => Some(Self::Operational),
            _ => None,
        }
    }

    /// Grade codes selectable under this band, lowest first.
    pub fn grades(self) -> &'static [&'static str] {
        match self {
            Self::Executive => &["E1", "E2"],
            Self::Managerial => &["M1", "M2", "M3"],
            Self::Supervisory => &["S1", "S2"],
            Self::Professional => &["P1", "P2", "P3"],
            Self::Operational => &["O1", "O2", "O3"],
        }
    }

    pub fn allows_grade(self, grade: &str) -> bool {
        self.grades().contains(&grade)
    }
}

/// Publication state of one job description version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JdStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl JdStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// The six fixed responsibility categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsibilityCategory {
    Strategic,
    TeamManagement,
    General,
    Culture,
    Learning,
    Others,
}

impl ResponsibilityCategory {
    pub const ALL: [ResponsibilityCategory; 6] = [
        ResponsibilityCategory::Strategic,
        ResponsibilityCategory::TeamManagement,
        ResponsibilityCategory::General,
        ResponsibilityCategory::Culture,
        ResponsibilityCategory::Learning,
        ResponsibilityCategory::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strategic => "strategic",
            Self::TeamManagement => "team_management",
            Self::General => "general",
            Self::Culture => "culture",
            Self::Learning => "learning",
            Self::Others => "others",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "strategic" => Some(Self::Strategic),
            "team_management" => Some(Self::TeamManagement),
            "general" => Some(Self::General),
            "culture" => Some(Self::Culture),
            "learning" => Some(Self::Learning),
            "others" => Some(Self::Others),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    External,
    Internal,
}

impl RiskType {
    pub const ALL: [RiskType; 2] = [RiskType::External, RiskType::Internal];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "external" => Some(Self::External),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// One responsibility line owned by an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibilityItem {
    pub category: ResponsibilityCategory,
    pub description: String,
    pub order_index: u32,
}

/// One risk line owned by an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskItem {
    pub risk_type: RiskType,
    pub description: String,
    pub risk_level: RiskLevel,
    pub order_index: u32,
}

/// Persisted score for one catalog competency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyScore {
    pub competency_id: String,
    /// Joined from the competency catalog on read; ignored on write.
    pub competency_name: Option<String>,
    pub score: u8,
    pub notes: Option<String>,
}

impl CompetencyScore {
    pub fn new(competency_id: impl Into<String>, score: u8) -> Self {
        Self {
            competency_id: competency_id.into(),
            competency_name: None,
            score,
            notes: None,
        }
    }
}

/// Editable scalar attributes shared by create and update submissions.
///
/// Reference fields are plain strings so an unfilled form can be
/// represented; the validator rejects empty values before persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptionFields {
    pub position: String,
    pub job_band: Option<JobBand>,
    pub job_grade: String,
    pub location_id: String,
    pub department_id: String,
    pub team_id: String,
    pub direct_supervisor: String,
    pub job_purpose: String,
    pub assets: Vec<AssetRef>,
    pub responsibility_percentages: ResponsibilityPercentages,
}

/// Create submission in persisted (normalized) shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDescriptionDraft {
    pub fields: JobDescriptionFields,
    pub responsibilities: Vec<ResponsibilityItem>,
    pub risks: Vec<RiskItem>,
    pub competencies: Vec<CompetencyScore>,
}

/// Update submission. `None` leaves that child collection untouched;
/// `Some` replaces it wholesale (an empty list clears it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDescriptionUpdate {
    pub fields: JobDescriptionFields,
    pub responsibilities: Option<Vec<ResponsibilityItem>>,
    pub risks: Option<Vec<RiskItem>>,
    pub competencies: Option<Vec<CompetencyScore>>,
}

impl From<JobDescriptionDraft> for JobDescriptionUpdate {
    fn from(value: JobDescriptionDraft) -> Self {
        Self {
            fields: value.fields,
            responsibilities: Some(value.responsibilities),
            risks: Some(value.risks),
            competencies: Some(value.competencies),
        }
    }
}

/// Root record: scalar attributes only, stored apart from its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptionRoot {
    pub id: JobDescriptionId,
    pub position: String,
    pub job_band: JobBand,
    pub job_grade: String,
    pub location_id: String,
    pub department_id: String,
    pub team_id: String,
    pub direct_supervisor: String,
    pub job_purpose: String,
    pub status: JdStatus,
    pub created_by: String,
    pub updated_by: String,
    pub version: u32,
    pub parent_version_id: Option<JobDescriptionId>,
    pub assets: Vec<AssetRef>,
    pub responsibility_percentages: ResponsibilityPercentages,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Root record plus its owned child collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    pub root: JobDescriptionRoot,
    pub responsibilities: Vec<ResponsibilityItem>,
    pub risks: Vec<RiskItem>,
    pub competencies: Vec<CompetencyScore>,
}

impl JobDescription {
    pub fn id(&self) -> JobDescriptionId {
        self.root.id
    }

    /// Editable fields as currently stored, for building an update.
    pub fn fields(&self) -> JobDescriptionFields {
        JobDescriptionFields {
            position: self.root.position.clone(),
            job_band: Some(self.root.job_band),
            job_grade: self.root.job_grade.clone(),
            location_id: self.root.location_id.clone(),
            department_id: self.root.department_id.clone(),
            team_id: self.root.team_id.clone(),
            direct_supervisor: self.root.direct_supervisor.clone(),
            job_purpose: self.root.job_purpose.clone(),
            assets: self.root.assets.clone(),
            responsibility_percentages: self.root.responsibility_percentages.clone(),
        }
    }
}

/// List-view row: root attributes with eagerly joined lookup names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptionSummary {
    pub id: JobDescriptionId,
    pub position: String,
    pub job_band: JobBand,
    pub job_grade: String,
    pub status: JdStatus,
    pub version: u32,
    pub parent_version_id: Option<JobDescriptionId>,
    pub location_name: Option<String>,
    pub department_name: Option<String>,
    pub team_name: Option<String>,
    pub updated_at: i64,
}
