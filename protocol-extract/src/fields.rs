//! Section vocabulary and the per-field parser.
//!
//! [`SECTIONS`] is the single source of truth for the tag pairs: the
//! extraction prompt is rendered from it and the parser reads with it.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::MalformedFieldError;
use crate::models::{
    DEFAULT_AE_GUIDELINES, PresentationSlide, SpecimenLogistics, SpecimenProcedure,
    StatisticalDataPoint,
};
use crate::tags::extract_section;

/// One tagged section the model is asked to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub field: &'static str,
    pub start_tag: &'static str,
    pub end_tag: &'static str,
    /// Shape description appended to the tag line in the prompt.
    pub shape_hint: Option<&'static str>,
}

impl Section {
    const fn new(
        field: &'static str,
        start_tag: &'static str,
        end_tag: &'static str,
        shape_hint: Option<&'static str>,
    ) -> Self {
        Self {
            field,
            start_tag,
            end_tag,
            shape_hint,
        }
    }

    pub fn extract<'a>(&self, raw: &'a str) -> &'a str {
        extract_section(raw, self.start_tag, self.end_tag)
    }
}

pub const SCREENING_LIST: Section = Section::new(
    "screeningItems",
    "SCREENING_LIST_START",
    "SCREENING_LIST_END",
    None,
);
pub const AE_GUIDELINES: Section = Section::new(
    "aeGuidelines",
    "AE_GUIDELINES_START",
    "AE_GUIDELINES_END",
    None,
);
pub const TRIAL_SUMMARY: Section = Section::new(
    "summary",
    "TRIAL_SUMMARY_START",
    "TRIAL_SUMMARY_END",
    None,
);
pub const STUDY_ALGORITHM: Section = Section::new(
    "algorithm",
    "STUDY_ALGORITHM_START",
    "STUDY_ALGORITHM_END",
    None,
);
pub const DRUG_FEATURES: Section = Section::new(
    "drugFeatures",
    "DRUG_FEATURES_START",
    "DRUG_FEATURES_END",
    None,
);
pub const PREP_REQS: Section = Section::new(
    "prepRequirements",
    "PREP_REQS_START",
    "PREP_REQS_END",
    None,
);
pub const STAT_DATA: Section = Section::new(
    "statisticalAnalysis",
    "STAT_DATA_JSON_START",
    "STAT_DATA_JSON_END",
    Some("JSON array of {label, value} where value is a number"),
);
pub const SLIDES: Section = Section::new(
    "presentationSlides",
    "SLIDES_JSON_START",
    "SLIDES_JSON_END",
    Some("JSON array of {title, bullets: string[]}"),
);
pub const SPECIMEN_TASKS: Section = Section::new(
    "specimenProcedures",
    "SPECIMEN_TASKS_JSON_START",
    "SPECIMEN_TASKS_JSON_END",
    Some("JSON array of {task, details}"),
);
pub const SHIPPING: Section = Section::new(
    "specimenLogistics",
    "SHIPPING_JSON_START",
    "SHIPPING_JSON_END",
    Some("JSON object of {address, courier, courierContact}"),
);

pub const SECTIONS: [Section; 10] = [
    SCREENING_LIST,
    AE_GUIDELINES,
    TRIAL_SUMMARY,
    STUDY_ALGORITHM,
    DRUG_FEATURES,
    PREP_REQS,
    STAT_DATA,
    SLIDES,
    SPECIMEN_TASKS,
    SHIPPING,
];

/// Every structured field of a protocol analysis, before the screening block
/// is split into items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSections {
    pub screening_block: String,
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

/// Read every section out of `raw`.
///
/// Fields are independent: a missing section or unreadable JSON only resets
/// that one field to its default.
pub fn parse_sections(raw: &str) -> ParsedSections {
    let ae_guidelines = match AE_GUIDELINES.extract(raw) {
        "" => DEFAULT_AE_GUIDELINES.to_string(),
        text => text.to_string(),
    };

    ParsedSections {
        screening_block: SCREENING_LIST.extract(raw).to_string(),
        ae_guidelines,
        summary: TRIAL_SUMMARY.extract(raw).to_string(),
        algorithm: STUDY_ALGORITHM.extract(raw).to_string(),
        drug_features: DRUG_FEATURES.extract(raw).to_string(),
        prep_requirements: PREP_REQS.extract(raw).to_string(),
        statistical_analysis: json_field(raw, &STAT_DATA),
        presentation_slides: json_field(raw, &SLIDES),
        specimen_procedures: json_field(raw, &SPECIMEN_TASKS),
        specimen_logistics: json_field(raw, &SHIPPING),
    }
}

fn json_field<T: DeserializeOwned + Default>(raw: &str, section: &Section) -> T {
    let body = section.extract(raw);
    if body.is_empty() {
        debug!(field = section.field, "section absent, using default");
        return T::default();
    }

    decode_json_section(section.field, body).unwrap_or_else(|err| {
        warn!(
            field = err.field,
            error = %err.source,
            "malformed JSON section, using default"
        );
        T::default()
    })
}

/// Deserialize one section body, unwrapping a Markdown code fence if the
/// model added one.
pub fn decode_json_section<T: DeserializeOwned>(
    field: &'static str,
    body: &str,
) -> Result<T, MalformedFieldError> {
    serde_json::from_str(unwrap_code_fence(body))
        .map_err(|source| MalformedFieldError { field, source })
}

fn unwrap_code_fence(body: &str) -> &str {
    let body = body.trim();
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
