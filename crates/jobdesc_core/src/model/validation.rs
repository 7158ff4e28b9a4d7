//! Submission gate for create/update.
//!
//! # Responsibility
//! - Reject incomplete or inconsistent submissions before any store call.
//!
//! # Invariants
//! - Checks run in a fixed order and the first failure wins; callers see one
//!   specific reason at a time.
//! - Validation has no side effects.

use crate::model::job_description::{
    CompetencyScore, JobBand, JobDescriptionDraft, JobDescriptionFields, JobDescriptionUpdate,
    MAX_SCORE, MIN_PERSISTED_SCORE,
};
use crate::model::percentages::FULL_ALLOCATION;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Required scalar inputs, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Position,
    JobBand,
    JobGrade,
    Location,
    Department,
    Team,
    JobPurpose,
}

impl RequiredField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::JobBand => "Job band",
            Self::JobGrade => "Job grade",
            Self::Location => "Location",
            Self::Department => "Department",
            Self::Team => "Team",
            Self::JobPurpose => "Job purpose",
        }
    }
}

/// First failed check for a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(RequiredField),
    GradeNotInBand { band: JobBand, grade: String },
    PercentageTotal { total: u32 },
    ScoreOutOfRange { competency_id: String, score: u8 },
    DuplicateCompetency(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{} is required", field.label()),
            Self::GradeNotInBand { band, grade } => write!(
                f,
                "job grade `{grade}` is not available for band `{}`",
                band.as_str()
            ),
            Self::PercentageTotal { total } => write!(
                f,
                "responsibility percentages must total {FULL_ALLOCATION}% (currently {total}%)"
            ),
            Self::ScoreOutOfRange {
                competency_id,
                score,
            } => write!(
                f,
                "competency `{competency_id}` score {score} is outside {MIN_PERSISTED_SCORE}..={MAX_SCORE}"
            ),
            Self::DuplicateCompetency(id) => write!(f, "competency `{id}` is scored more than once"),
        }
    }
}

impl Error for ValidationError {}

/// Validates scalar attributes and the percentage allocation.
pub fn validate_fields(fields: &JobDescriptionFields) -> Result<(), ValidationError> {
    require_text(&fields.position, RequiredField::Position)?;
    let band = fields
        .job_band
        .ok_or(ValidationError::MissingField(RequiredField::JobBand))?;
    require_text(&fields.job_grade, RequiredField::JobGrade)?;
    require_text(&fields.location_id, RequiredField::Location)?;
    require_text(&fields.department_id, RequiredField::Department)?;
    require_text(&fields.team_id, RequiredField::Team)?;
    require_text(&fields.job_purpose, RequiredField::JobPurpose)?;

    if !band.allows_grade(fields.job_grade.trim()) {
        return Err(ValidationError::GradeNotInBand {
            band,
            grade: fields.job_grade.clone(),
        });
    }

    let total = fields.responsibility_percentages.total();
    if total != FULL_ALLOCATION {
        return Err(ValidationError::PercentageTotal { total });
    }

    Ok(())
}

/// Validates a competency score list about to be persisted.
pub fn validate_competencies(scores: &[CompetencyScore]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for score in scores {
        if !(MIN_PERSISTED_SCORE..=MAX_SCORE).contains(&score.score) {
            return Err(ValidationError::ScoreOutOfRange {
                competency_id: score.competency_id.clone(),
                score: score.score,
            });
        }
        if !seen.insert(score.competency_id.as_str()) {
            return Err(ValidationError::DuplicateCompetency(
                score.competency_id.clone(),
            ));
        }
    }
    Ok(())
}

impl JobDescriptionDraft {
    /// Full create gate: either everything passes or nothing is persisted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.fields)?;
        validate_competencies(&self.competencies)
    }
}

impl JobDescriptionUpdate {
    /// Update gate; omitted child collections are not checked.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.fields)?;
        if let Some(scores) = self.competencies.as_ref() {
            validate_competencies(scores)?;
        }
        Ok(())
    }
}

fn require_text(value: &str, field: RequiredField) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}
