use serde::{Deserialize, Serialize};

/// Screening item used when the model produced no usable checklist.
pub const DEFAULT_SCREENING_ITEM: &str = "Standard Screening";

/// Adverse-event guidance used when the model produced none.
pub const DEFAULT_AE_GUIDELINES: &str = "Follow GCP guidelines.";

/// Structured guidance extracted from a study protocol.
///
/// Every field is always populated: sections the model omitted, or whose
/// JSON could not be read, carry the documented defaults instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Model output with every tagged section removed.
    pub narrative_text: String,
    pub screening_items: Vec<String>,
    pub ae_guidelines: String,
    pub summary: String,
    pub algorithm: String,
    pub drug_features: String,
    pub prep_requirements: String,
    pub statistical_analysis: Vec<StatisticalDataPoint>,
    pub presentation_slides: Vec<PresentationSlide>,
    pub specimen_procedures: Vec<SpecimenProcedure>,
    pub specimen_logistics: SpecimenLogistics,
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self {
            narrative_text: String::new(),
            screening_items: vec![DEFAULT_SCREENING_ITEM.to_string()],
            ae_guidelines: DEFAULT_AE_GUIDELINES.to_string(),
            summary: String::new(),
            algorithm: String::new(),
            drug_features: String::new(),
            prep_requirements: String::new(),
            statistical_analysis: Vec::new(),
            presentation_slides: Vec::new(),
            specimen_procedures: Vec::new(),
            specimen_logistics: SpecimenLogistics::default(),
        }
    }
}

/// A named statistical design parameter such as alpha or power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalDataPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationSlide {
    pub title: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

/// One lab-tech task for specimen processing (e.g. centrifugation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecimenProcedure {
    pub task: String,
    pub details: String,
}

/// Where and how specimens are shipped. Missing keys read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecimenLogistics {
    pub address: String,
    pub courier: String,
    pub courier_contact: String,
}
