//! protocol-extract
//!
//! Sends a clinical-trial protocol PDF to a generative model, reads the
//! tagged sections of its reply into typed coordinator guidance, and answers
//! free-form questions about a study.

pub mod assistant;
pub mod checklist;
pub mod client;
pub mod error;
pub mod fields;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod synthesizer;
pub mod tags;

// Re-export commonly used types
pub use assistant::StudyAssistant;
pub use checklist::normalize_checklist;
pub use client::{
    GenerationClient, GenerationConfig, GenerationRequest, GenerationResponse,
    MockGenerationClient, OpenRouterClient, Part,
};
pub use error::{ExtractError, MalformedFieldError, Result, ValidationError};
pub use fields::{ParsedSections, SECTIONS, Section, parse_sections};
pub use models::{
    ExtractionResult, PresentationSlide, SpecimenLogistics, SpecimenProcedure,
    StatisticalDataPoint,
};
pub use orchestrator::{ExtractionRequest, PDF_MIME_TYPE, ProtocolExtractor, assemble_result};
pub use synthesizer::{ASSISTANT_ERROR_FALLBACK, NO_INSIGHT_FALLBACK, ResponseSynthesizer};
pub use tags::{extract_section, strip_tagged_sections};
