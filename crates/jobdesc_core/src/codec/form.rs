//! Edit-form state and its codec.
//!
//! # Responsibility
//! - Hold six responsibility buffers, two risk buffers and one score slot per
//!   catalog competency, the way an edit screen needs them.
//! - Convert to `JobDescriptionDraft`/`JobDescriptionUpdate` and back.
//!
//! # Invariants
//! - Every responsibility category and risk type has a buffer.
//! - After loading, each risk buffer has at least one (possibly blank) row.
//! - Blank descriptions are dropped when flattening.
//! - A competency slot of `None` or `Some(0)` is "not scored" and is never
//!   flattened; reloading cannot tell the two apart.

use crate::model::catalog::CatalogItem;
use crate::model::job_description::{
    CompetencyScore, JobBand, JobDescription, JobDescriptionDraft, JobDescriptionFields,
    JobDescriptionUpdate, ResponsibilityCategory, ResponsibilityItem, RiskItem, RiskLevel,
    RiskType,
};
use crate::model::percentages::ResponsibilityPercentages;
use crate::resolver::asset_resolver::AssetSelection;
use std::collections::BTreeMap;

/// One editable risk row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskRow {
    pub description: String,
    pub risk_level: RiskLevel,
}

impl RiskRow {
    pub fn new(description: impl Into<String>, risk_level: RiskLevel) -> Self {
        Self {
            description: description.into(),
            risk_level,
        }
    }
}

/// Score slot for one competency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetencyEntry {
    pub competency_id: String,
    pub competency_name: String,
    /// `None` means not scored.
    pub score: Option<u8>,
    pub notes: String,
}

impl CompetencyEntry {
    fn unscored(item: &CatalogItem) -> Self {
        Self {
            competency_id: item.id.clone(),
            competency_name: item.name.clone(),
            score: None,
            notes: String::new(),
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self.score, Some(score) if score > 0)
    }
}

/// Flat editable state of one job description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdForm {
    pub position: String,
    pub job_band: Option<JobBand>,
    pub job_grade: String,
    pub location_id: String,
    pub department_id: String,
    pub team_id: String,
    pub direct_supervisor: String,
    pub job_purpose: String,
    pub assets: AssetSelection,
    pub percentages: ResponsibilityPercentages,
    pub responsibilities: BTreeMap<ResponsibilityCategory, Vec<String>>,
    pub risks: BTreeMap<RiskType, Vec<RiskRow>>,
    pub competencies: Vec<CompetencyEntry>,
}

impl JdForm {
    /// Blank form with one slot per catalog competency.
    pub fn new(competency_catalog: &[CatalogItem]) -> Self {
        Self {
            position: String::new(),
            job_band: None,
            job_grade: String::new(),
            location_id: String::new(),
            department_id: String::new(),
            team_id: String::new(),
            direct_supervisor: String::new(),
            job_purpose: String::new(),
            assets: AssetSelection::default(),
            percentages: ResponsibilityPercentages::new(),
            responsibilities: empty_responsibility_buffers(),
            risks: partition_risks(&[]),
            competencies: join_competencies(&[], competency_catalog),
        }
    }

    /// Loads a persisted aggregate into edit-form state.
    pub fn from_aggregate(jd: &JobDescription, competency_catalog: &[CatalogItem]) -> Self {
        let root = &jd.root;
        Self {
            position: root.position.clone(),
            job_band: Some(root.job_band),
            job_grade: root.job_grade.clone(),
            location_id: root.location_id.clone(),
            department_id: root.department_id.clone(),
            team_id: root.team_id.clone(),
            direct_supervisor: root.direct_supervisor.clone(),
            job_purpose: root.job_purpose.clone(),
            assets: AssetSelection::from_refs(&root.assets),
            percentages: root.responsibility_percentages.clone(),
            responsibilities: partition_responsibilities(&jd.responsibilities),
            risks: partition_risks(&jd.risks),
            competencies: join_competencies(&jd.competencies, competency_catalog),
        }
    }

    /// Clamped percentage edit; returns the stored value.
    pub fn set_percentage(&mut self, category: ResponsibilityCategory, requested: u32) -> u8 {
        self.percentages.set_clamped(category, requested)
    }

    pub fn push_responsibility(
        &mut self,
        category: ResponsibilityCategory,
        description: impl Into<String>,
    ) {
        self.responsibilities
            .entry(category)
            .or_default()
            .push(description.into());
    }

    pub fn push_risk(&mut self, risk_type: RiskType, row: RiskRow) {
        self.risks.entry(risk_type).or_default().push(row);
    }

    /// Sets the score slot for `competency_id`. Returns `false` when the
    /// competency is not part of this form.
    pub fn set_score(&mut self, competency_id: &str, score: Option<u8>) -> bool {
        match self
            .competencies
            .iter_mut()
            .find(|entry| entry.competency_id == competency_id)
        {
            Some(entry) => {
                entry.score = score;
                true
            }
            None => false,
        }
    }

    pub fn to_fields(&self) -> JobDescriptionFields {
        JobDescriptionFields {
            position: self.position.clone(),
            job_band: self.job_band,
            job_grade: self.job_grade.clone(),
            location_id: self.location_id.clone(),
            department_id: self.department_id.clone(),
            team_id: self.team_id.clone(),
            direct_supervisor: self.direct_supervisor.clone(),
            job_purpose: self.job_purpose.clone(),
            assets: self.assets.to_refs(),
            responsibility_percentages: self.percentages.clone(),
        }
    }

    /// Persisted shape for a create submission.
    pub fn to_draft(&self) -> JobDescriptionDraft {
        JobDescriptionDraft {
            fields: self.to_fields(),
            responsibilities: flatten_responsibilities(&self.responsibilities),
            risks: flatten_risks(&self.risks),
            competencies: flatten_competencies(&self.competencies),
        }
    }

    /// Persisted shape for an update that replaces every child collection.
    pub fn to_update(&self) -> JobDescriptionUpdate {
        self.to_draft().into()
    }
}

/// Concatenates category buffers in category order.
///
/// `order_index` is the position in the resulting list.
pub fn flatten_responsibilities(
    buffers: &BTreeMap<ResponsibilityCategory, Vec<String>>,
) -> Vec<ResponsibilityItem> {
    let mut items = Vec::new();
    for (category, descriptions) in buffers {
        for description in descriptions {
            let description = description.trim();
            if description.is_empty() {
                continue;
            }
            items.push(ResponsibilityItem {
                category: *category,
                description: description.to_string(),
                order_index: next_index(items.len()),
            });
        }
    }
    items
}

/// Concatenates risk buffers (external first, then internal).
pub fn flatten_risks(buffers: &BTreeMap<RiskType, Vec<RiskRow>>) -> Vec<RiskItem> {
    let mut items = Vec::new();
    for (risk_type, rows) in buffers {
        for row in rows {
            let description = row.description.trim();
            if description.is_empty() {
                continue;
            }
            items.push(RiskItem {
                risk_type: *risk_type,
                description: description.to_string(),
                risk_level: row.risk_level,
                order_index: next_index(items.len()),
            });
        }
    }
    items
}

/// Keeps only scored slots.
pub fn flatten_competencies(entries: &[CompetencyEntry]) -> Vec<CompetencyScore> {
    entries
        .iter()
        .filter(|entry| entry.is_scored())
        .filter_map(|entry| {
            let score = entry.score?;
            let notes = entry.notes.trim();
            Some(CompetencyScore {
                competency_id: entry.competency_id.clone(),
                competency_name: None,
                score,
                notes: (!notes.is_empty()).then(|| notes.to_string()),
            })
        })
        .collect()
}

/// Splits a persisted list into one buffer per category, by `order_index`.
pub fn partition_responsibilities(
    items: &[ResponsibilityItem],
) -> BTreeMap<ResponsibilityCategory, Vec<String>> {
    let mut sorted: Vec<&ResponsibilityItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.order_index);

    let mut buffers = empty_responsibility_buffers();
    for item in sorted {
        buffers
            .entry(item.category)
            .or_default()
            .push(item.description.clone());
    }
    buffers
}

/// Splits a persisted list by risk type; empty types get one blank row.
pub fn partition_risks(items: &[RiskItem]) -> BTreeMap<RiskType, Vec<RiskRow>> {
    let mut sorted: Vec<&RiskItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.order_index);

    let mut buffers: BTreeMap<RiskType, Vec<RiskRow>> = RiskType::ALL
        .iter()
        .map(|risk_type| (*risk_type, Vec::new()))
        .collect();
    for item in sorted {
        buffers
            .entry(item.risk_type)
            .or_default()
            .push(RiskRow::new(item.description.clone(), item.risk_level));
    }
    for rows in buffers.values_mut() {
        if rows.is_empty() {
            rows.push(RiskRow::default());
        }
    }
    buffers
}

/// One slot per catalog competency (catalog order), scored where a persisted
/// score exists. Persisted scores for competencies missing from the catalog
/// are appended so saving the form does not drop them.
pub fn join_competencies(
    scores: &[CompetencyScore],
    competency_catalog: &[CatalogItem],
) -> Vec<CompetencyEntry> {
    let mut entries: Vec<CompetencyEntry> = competency_catalog
        .iter()
        .map(CompetencyEntry::unscored)
        .collect();

    for score in scores {
        match entries
            .iter_mut()
            .find(|entry| entry.competency_id == score.competency_id)
        {
            Some(entry) => {
                entry.score = Some(score.score);
                entry.notes = score.notes.clone().unwrap_or_default();
            }
            None => entries.push(CompetencyEntry {
                competency_id: score.competency_id.clone(),
                competency_name: score
                    .competency_name
                    .clone()
                    .unwrap_or_else(|| score.competency_id.clone()),
                score: Some(score.score),
                notes: score.notes.clone().unwrap_or_default(),
            }),
        }
    }
    entries
}

fn empty_responsibility_buffers() -> BTreeMap<ResponsibilityCategory, Vec<String>> {
    ResponsibilityCategory::ALL
        .iter()
        .map(|category| (*category, Vec::new()))
        .collect()
}

fn next_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
