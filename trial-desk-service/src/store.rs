//! In-memory study and patient registry.
//!
//! All mutation goes through the scoped operations below; records are only
//! replaced through validated drafts or whole sub-records, never patched with
//! loose partial objects.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use protocol_extract::ExtractionResult;
use tracing::info;

use crate::error::StoreError;
use crate::models::{
    AdverseEvent, ClinicalTeam, ConsentStatus, DEFAULT_SCREENING_CHECKLIST, MonitorInfo,
    Patient, PatientStatus, ScreeningOutcome, Study,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Default)]
pub struct TrialStore {
    studies: Arc<DashMap<String, Study>>,
    patients: Arc<DashMap<String, Patient>>,
}

impl TrialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_study(&self, study: Study) -> StoreResult<Study> {
        match self.studies.entry(study.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateStudy(study.id)),
            Entry::Vacant(slot) => {
                info!(study_id = %study.id, "study registered");
                slot.insert(study.clone());
                Ok(study)
            }
        }
    }

    pub fn get_study(&self, study_id: &str) -> StoreResult<Study> {
        self.studies
            .get(study_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::StudyNotFound(study_id.to_string()))
    }

    /// All studies, ordered by id.
    pub fn list_studies(&self) -> Vec<Study> {
        let mut studies: Vec<Study> = self
            .studies
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        studies.sort_by(|a, b| a.id.cmp(&b.id));
        studies
    }

    pub fn update_team(&self, study_id: &str, team: ClinicalTeam) -> StoreResult<Study> {
        self.update_study(study_id, |study| study.team = Some(team))
    }

    pub fn update_monitor(&self, study_id: &str, monitor: MonitorInfo) -> StoreResult<Study> {
        self.update_study(study_id, |study| study.monitor = Some(monitor))
    }

    /// Shift enrollment by `delta`, never below zero.
    pub fn adjust_enrollment(&self, study_id: &str, delta: i64) -> StoreResult<Study> {
        self.update_study(study_id, |study| {
            let next = i64::from(study.current_enrollment).saturating_add(delta);
            study.current_enrollment = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
        })
    }

    /// Replace the study's protocol insight and screening checklist with a
    /// fresh extraction.
    pub fn apply_protocol_extraction(
        &self,
        study_id: &str,
        extraction: ExtractionResult,
    ) -> StoreResult<Study> {
        self.update_study(study_id, |study| {
            study.screening_checklist = extraction.screening_items.clone();
            study.protocol_insight = Some(extraction);
        })
    }

    fn update_study(&self, study_id: &str, apply: impl FnOnce(&mut Study)) -> StoreResult<Study> {
        let mut entry = self
            .studies
            .get_mut(study_id)
            .ok_or_else(|| StoreError::StudyNotFound(study_id.to_string()))?;
        apply(entry.value_mut());
        Ok(entry.value().clone())
    }

    pub fn add_patient(&self, patient: Patient) -> StoreResult<Patient> {
        if !self.studies.contains_key(&patient.study_id) {
            return Err(StoreError::StudyNotFound(patient.study_id));
        }
        match self.patients.entry(patient.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicatePatient(patient.id)),
            Entry::Vacant(slot) => {
                info!(patient_id = %patient.id, study_id = %patient.study_id, "patient added for screening");
                slot.insert(patient.clone());
                Ok(patient)
            }
        }
    }

    pub fn get_patient(&self, patient_id: &str) -> StoreResult<Patient> {
        self.patients
            .get(patient_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::PatientNotFound(patient_id.to_string()))
    }

    /// Patients of one study, ordered by id.
    pub fn list_patients(&self, study_id: &str) -> StoreResult<Vec<Patient>> {
        if !self.studies.contains_key(study_id) {
            return Err(StoreError::StudyNotFound(study_id.to_string()));
        }
        let mut patients: Vec<Patient> = self
            .patients
            .iter()
            .filter(|entry| entry.study_id == study_id)
            .map(|entry| entry.value().clone())
            .collect();
        patients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(patients)
    }

    pub fn sign_consent(
        &self,
        patient_id: &str,
        patient_signature: String,
        pi_signature: String,
    ) -> StoreResult<Patient> {
        if patient_signature.trim().is_empty() || pi_signature.trim().is_empty() {
            return Err(StoreError::Invalid(
                "both patient and PI signatures are required".to_string(),
            ));
        }
        self.update_patient(patient_id, |patient| {
            patient.consent_status = ConsentStatus::Signed;
            patient.patient_signature = Some(patient_signature);
            patient.pi_signature = Some(pi_signature);
        })
    }

    /// Mark a screening item done, or undo it if it already was.
    pub fn toggle_screening_item(&self, patient_id: &str, item: &str) -> StoreResult<Patient> {
        self.update_patient(patient_id, |patient| {
            let completed = &mut patient.completed_screening_items;
            match completed.iter().position(|done| done == item) {
                Some(index) => {
                    completed.remove(index);
                }
                None => completed.push(item.to_string()),
            }
        })
    }

    /// Close out screening. A pass enrolls the patient and counts them
    /// against the study's enrollment. Only patients still in screening can
    /// be finalized.
    pub fn finalize_screening(
        &self,
        patient_id: &str,
        outcome: ScreeningOutcome,
    ) -> StoreResult<Patient> {
        let patient = {
            let mut entry = self
                .patients
                .get_mut(patient_id)
                .ok_or_else(|| StoreError::PatientNotFound(patient_id.to_string()))?;
            if entry.status != PatientStatus::Screening {
                return Err(StoreError::Invalid(format!(
                    "patient {patient_id} is no longer in screening ({:?})",
                    entry.status
                )));
            }
            entry.status = match outcome {
                ScreeningOutcome::Pass => PatientStatus::Enrolled,
                ScreeningOutcome::Fail => PatientStatus::ScreenFailure,
            };
            entry.value().clone()
        };

        if outcome == ScreeningOutcome::Pass {
            self.adjust_enrollment(&patient.study_id, 1)?;
        }
        info!(patient_id, outcome = ?outcome, "screening finalized");
        Ok(patient)
    }

    pub fn report_adverse_event(
        &self,
        patient_id: &str,
        event: AdverseEvent,
    ) -> StoreResult<Patient> {
        let event_id = event.id.clone();
        let event_type = event.event_type;
        let patient =
            self.update_patient(patient_id, |patient| patient.reported_events.push(event))?;
        info!(
            patient_id,
            event_id = %event_id,
            event_type = ?event_type,
            "adverse event reported"
        );
        Ok(patient)
    }

    /// The checklist a patient is screened against.
    pub fn screening_checklist_for(&self, patient_id: &str) -> StoreResult<Vec<String>> {
        let patient = self.get_patient(patient_id)?;
        let study = self.get_study(&patient.study_id)?;
        if study.screening_checklist.is_empty() {
            Ok(DEFAULT_SCREENING_CHECKLIST
                .iter()
                .map(|item| item.to_string())
                .collect())
        } else {
            Ok(study.screening_checklist)
        }
    }

    /// Extracted adverse-event guidance for the patient's study, if a
    /// protocol has been analyzed.
    pub fn ae_guidelines_for(&self, patient_id: &str) -> StoreResult<Option<String>> {
        let patient = self.get_patient(patient_id)?;
        let study = self.get_study(&patient.study_id)?;
        Ok(study.protocol_insight.map(|insight| insight.ae_guidelines))
    }

    fn update_patient(
        &self,
        patient_id: &str,
        apply: impl FnOnce(&mut Patient),
    ) -> StoreResult<Patient> {
        let mut entry = self
            .patients
            .get_mut(patient_id)
            .ok_or_else(|| StoreError::PatientNotFound(patient_id.to_string()))?;
        apply(entry.value_mut());
        Ok(entry.value().clone())
    }
}
