//! Before/after comparator for two aggregate snapshots.
//!
//! # Responsibility
//! - Compare scalar fields by structural value equality.
//! - Compare each child list as a whole; no per-item matching.
//!
//! # Invariants
//! - Comparing a snapshot to itself reports nothing changed.
//! - Changing one scalar field reports exactly that field.
//! - Bookkeeping columns (`id`, timestamps, `version`, lineage,
//!   `created_by`/`updated_by`) are never compared.
//! - No conflict detection and no merge; this is a display aid.

use crate::model::job_description::JobDescription;
use serde::Serialize;
use serde_json::Value;

/// Scalar fields compared between versions, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffField {
    Position,
    JobBand,
    JobGrade,
    LocationId,
    DepartmentId,
    TeamId,
    DirectSupervisor,
    JobPurpose,
    Status,
    Assets,
    ResponsibilityPercentages,
}

impl DiffField {
    pub const ALL: [DiffField; 11] = [
        DiffField::Position,
        DiffField::JobBand,
        DiffField::JobGrade,
        DiffField::LocationId,
        DiffField::DepartmentId,
        DiffField::TeamId,
        DiffField::DirectSupervisor,
        DiffField::JobPurpose,
        DiffField::Status,
        DiffField::Assets,
        DiffField::ResponsibilityPercentages,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::JobBand => "job_band",
            Self::JobGrade => "job_grade",
            Self::LocationId => "location_id",
            Self::DepartmentId => "department_id",
            Self::TeamId => "team_id",
            Self::DirectSupervisor => "direct_supervisor",
            Self::JobPurpose => "job_purpose",
            Self::Status => "status",
            Self::Assets => "assets",
            Self::ResponsibilityPercentages => "responsibility_percentages",
        }
    }

    fn value_of(self, jd: &JobDescription) -> Value {
        let root = &jd.root;
        match self {
            Self::Position => to_value(&root.position),
            Self::JobBand => to_value(&root.job_band),
            Self::JobGrade => to_value(&root.job_grade),
            Self::LocationId => to_value(&root.location_id),
            Self::DepartmentId => to_value(&root.department_id),
            Self::TeamId => to_value(&root.team_id),
            Self::DirectSupervisor => to_value(&root.direct_supervisor),
            Self::JobPurpose => to_value(&root.job_purpose),
            Self::Status => to_value(&root.status),
            Self::Assets => to_value(&root.assets),
            Self::ResponsibilityPercentages => to_value(&root.responsibility_percentages),
        }
    }
}

/// Child lists compared between versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffList {
    Responsibilities,
    Risks,
    Competencies,
}

impl DiffList {
    pub const ALL: [DiffList; 3] = [
        DiffList::Responsibilities,
        DiffList::Risks,
        DiffList::Competencies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Responsibilities => "responsibilities",
            Self::Risks => "risks",
            Self::Competencies => "competencies",
        }
    }

    fn value_of(self, jd: &JobDescription) -> Value {
        match self {
            Self::Responsibilities => to_value(&jd.responsibilities),
            Self::Risks => to_value(&jd.risks),
            Self::Competencies => to_value(&jd.competencies),
        }
    }
}

/// Before/after pair for one scalar field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: DiffField,
    pub before: Value,
    pub after: Value,
    pub changed: bool,
}

/// Both full lists, rendered side by side by callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListComparison {
    pub list: DiffList,
    pub before: Value,
    pub after: Value,
    pub changed: bool,
}

/// Change report between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDiff {
    pub before_version: u32,
    pub after_version: u32,
    pub fields: Vec<FieldChange>,
    pub lists: Vec<ListComparison>,
}

impl VersionDiff {
    pub fn changed_fields(&self) -> Vec<DiffField> {
        self.fields
            .iter()
            .filter(|change| change.changed)
            .map(|change| change.field)
            .collect()
    }

    pub fn changed_lists(&self) -> Vec<DiffList> {
        self.lists
            .iter()
            .filter(|comparison| comparison.changed)
            .map(|comparison| comparison.list)
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        self.fields.iter().any(|change| change.changed)
            || self.lists.iter().any(|comparison| comparison.changed)
    }

    /// Names of every changed field and list, for audit metadata.
    pub fn changed_names(&self) -> Vec<&'static str> {
        self.changed_fields()
            .into_iter()
            .map(DiffField::as_str)
            .chain(self.changed_lists().into_iter().map(DiffList::as_str))
            .collect()
    }
}

/// Outcome of comparing a version with its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionComparison {
    /// `parent_version_id` is unset or its target could not be loaded.
    NoPreviousVersion,
    Compared(VersionDiff),
}

/// Compares two snapshots field by field and list by list.
pub fn diff_versions(before: &JobDescription, after: &JobDescription) -> VersionDiff {
    let fields = DiffField::ALL
        .iter()
        .map(|field| {
            let before_value = field.value_of(before);
            let after_value = field.value_of(after);
            FieldChange {
                field: *field,
                changed: before_value != after_value,
                before: before_value,
                after: after_value,
            }
        })
        .collect();

    let lists = DiffList::ALL
        .iter()
        .map(|list| {
            let before_value = list.value_of(before);
            let after_value = list.value_of(after);
            ListComparison {
                list: *list,
                changed: before_value != after_value,
                before: before_value,
                after: after_value,
            }
        })
        .collect();

    VersionDiff {
        before_version: before.root.version,
        after_version: after.root.version,
        fields,
        lists,
    }
}

/// Compares `current` with its loaded predecessor, if any.
pub fn compare_with_previous(
    current: &JobDescription,
    previous: Option<&JobDescription>,
) -> VersionComparison {
    match previous {
        Some(previous) => VersionComparison::Compared(diff_versions(previous, current)),
        None => VersionComparison::NoPreviousVersion,
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
