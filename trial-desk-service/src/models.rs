use chrono::{Months, NaiveDate};
use protocol_extract::ExtractionResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Checklist used for a study that has no extracted screening list yet.
pub const DEFAULT_SCREENING_CHECKLIST: [&str; 3] =
    ["Informed Consent", "Eligibility Review", "Vitals"];

pub const UNASSIGNED_INVESTIGATOR: &str = "Unassigned";
pub const DEFAULT_ENROLLMENT_TARGET: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyType {
    #[default]
    Drug,
    Device,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrugPhase {
    #[serde(rename = "Phase I")]
    PhaseI,
    #[serde(rename = "Phase II")]
    PhaseII,
    #[serde(rename = "Phase III")]
    PhaseIII,
    #[serde(rename = "Phase IV")]
    PhaseIV,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyStatus {
    Enrolling,
    Active,
    Completed,
    #[default]
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MilestoneStatus {
    Completed,
    InProgress,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub label: String,
    pub date: NaiveDate,
    pub status: MilestoneStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalTeam {
    pub principal_investigator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_principal_investigator: Option<String>,
    pub main_coordinator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute_coordinator: Option<String>,
}

/// The sponsor's monitor (CRA) assigned to a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorInfo {
    pub name: String,
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_visit: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub id: String,
    pub title: String,
    pub study_type: StudyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<DrugPhase>,
    pub is_follow_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_trial_name: Option<String>,
    pub principal_investigator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<ClinicalTeam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorInfo>,
    pub status: StudyStatus,
    pub enrollment_target: u32,
    pub current_enrollment: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub milestones: Vec<Milestone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_insight: Option<ExtractionResult>,
    pub screening_checklist: Vec<String>,
}

impl Study {
    /// Split off the protocol narrative so a question carries it once,
    /// under its own key, rather than again inside `protocolInsight`.
    pub fn into_question_context(mut self) -> (Study, Option<String>) {
        let narrative = self
            .protocol_insight
            .as_mut()
            .map(|insight| std::mem::take(&mut insight.narrative_text));
        (self, narrative)
    }
}

/// Input for a new study. Validated by [`StudyDraft::build`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyDraft {
    pub id: String,
    pub title: String,
    pub study_type: StudyType,
    pub phase: Option<DrugPhase>,
    pub is_follow_up: bool,
    pub previous_trial_name: Option<String>,
    pub principal_investigator: Option<String>,
    pub team: Option<ClinicalTeam>,
    pub monitor: Option<MonitorInfo>,
    pub status: StudyStatus,
    pub enrollment_target: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: String,
    pub milestones: Vec<Milestone>,
}

impl StudyDraft {
    pub fn build(self, today: NaiveDate) -> Result<Study, StoreError> {
        let id = required(self.id, "study id")?;
        let title = required(self.title, "study title")?;

        let enrollment_target = self.enrollment_target.unwrap_or(DEFAULT_ENROLLMENT_TARGET);
        if enrollment_target == 0 {
            return Err(StoreError::Invalid(
                "enrollment target must be at least 1".to_string(),
            ));
        }

        let start_date = self.start_date.unwrap_or(today);
        let end_date = self.end_date.unwrap_or_else(|| {
            start_date
                .checked_add_months(Months::new(24))
                .unwrap_or(start_date)
        });
        if end_date < start_date {
            return Err(StoreError::Invalid(format!(
                "end date {end_date} is before start date {start_date}"
            )));
        }

        let phase = match self.study_type {
            StudyType::Drug => self.phase,
            StudyType::Device => None,
        };
        let previous_trial_name = if self.is_follow_up {
            self.previous_trial_name
        } else {
            None
        };
        let principal_investigator = self
            .principal_investigator
            .filter(|pi| !pi.trim().is_empty())
            .unwrap_or_else(|| UNASSIGNED_INVESTIGATOR.to_string());

        Ok(Study {
            id,
            title,
            study_type: self.study_type,
            phase,
            is_follow_up: self.is_follow_up,
            previous_trial_name,
            principal_investigator,
            team: self.team,
            monitor: self.monitor,
            status: self.status,
            enrollment_target,
            current_enrollment: 0,
            start_date,
            end_date,
            description: self.description,
            milestones: self.milestones,
            protocol_insight: None,
            screening_checklist: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientStatus {
    Screening,
    Enrolled,
    #[serde(rename = "Screen Failure")]
    ScreenFailure,
    Withdrawn,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentStatus {
    Pending,
    Signed,
}

/// A trial participant, identified by subject code only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub study_id: String,
    pub gender: Gender,
    pub status: PatientStatus,
    pub last_visit: NaiveDate,
    pub consent_status: ConsentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pi_signature: Option<String>,
    pub completed_screening_items: Vec<String>,
    pub reported_events: Vec<AdverseEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDraft {
    pub id: String,
    pub gender: Gender,
    #[serde(default)]
    pub last_visit: Option<NaiveDate>,
}

impl PatientDraft {
    pub fn build(self, study_id: &str, today: NaiveDate) -> Result<Patient, StoreError> {
        Ok(Patient {
            id: required(self.id, "subject id")?,
            study_id: study_id.to_string(),
            gender: self.gender,
            status: PatientStatus::Screening,
            last_visit: self.last_visit.unwrap_or(today),
            consent_status: ConsentStatus::Pending,
            patient_signature: None,
            pi_signature: None,
            completed_screening_items: Vec::new(),
            reported_events: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdverseEventType {
    #[default]
    Ae,
    /// Serious adverse event.
    Sae,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdverseEventStatus {
    Open,
    Reported,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdverseEvent {
    pub id: String,
    pub event_type: AdverseEventType,
    pub description: String,
    pub date: NaiveDate,
    pub severity: Severity,
    pub status: AdverseEventStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdverseEventDraft {
    pub event_type: AdverseEventType,
    pub description: String,
    pub severity: Severity,
}

impl AdverseEventDraft {
    pub fn build(self, today: NaiveDate) -> Result<AdverseEvent, StoreError> {
        let description = required(self.description, "event description")?;
        let suffix = Uuid::new_v4().simple().to_string();

        Ok(AdverseEvent {
            id: format!("EVT-{}", &suffix[..8]),
            event_type: self.event_type,
            description,
            date: today,
            severity: self.severity,
            status: AdverseEventStatus::Reported,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreeningOutcome {
    Pass,
    Fail,
}

fn required(value: String, what: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Invalid(format!("{what} is required")));
    }
    Ok(trimmed.to_string())
}
