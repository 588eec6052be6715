use tracing::info;

use crate::checklist::normalize_checklist;
use crate::error::{Result, ValidationError};
use crate::fields::parse_sections;
use crate::models::ExtractionResult;
use crate::synthesizer::ResponseSynthesizer;
use crate::tags::strip_tagged_sections;

pub const PDF_MIME_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// A validated protocol upload. Only constructible from a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    document: Vec<u8>,
}

impl ExtractionRequest {
    /// Accepts `application/pdf` (parameters such as `; charset=binary` are
    /// ignored) whose bytes carry the `%PDF-` header.
    pub fn new(document: Vec<u8>, mime_type: &str) -> std::result::Result<Self, ValidationError> {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        if !essence.eq_ignore_ascii_case(PDF_MIME_TYPE) {
            return Err(ValidationError::UnsupportedMimeType(mime_type.to_string()));
        }
        if document.is_empty() {
            return Err(ValidationError::EmptyDocument);
        }
        if !document.starts_with(PDF_MAGIC) {
            return Err(ValidationError::NotPdf);
        }
        Ok(Self { document })
    }

    pub fn document(&self) -> &[u8] {
        &self.document
    }
}

/// Runs a protocol document through the model and decomposes the reply.
#[derive(Clone)]
pub struct ProtocolExtractor {
    synthesizer: ResponseSynthesizer,
}

impl ProtocolExtractor {
    pub fn new(synthesizer: ResponseSynthesizer) -> Self {
        Self { synthesizer }
    }

    /// Validate, analyze and parse one uploaded document.
    ///
    /// Rejected documents never reach the model. A failed model call fails
    /// the whole extraction; a bad section only defaults that section.
    pub async fn extract_protocol(
        &self,
        document: Vec<u8>,
        mime_type: &str,
    ) -> Result<ExtractionResult> {
        let request = ExtractionRequest::new(document, mime_type)?;
        self.extract(&request).await
    }

    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult> {
        let raw = self
            .synthesizer
            .analyze_document(request.document(), PDF_MIME_TYPE)
            .await?;

        let result = assemble_result(&raw);
        info!(
            screening_items = result.screening_items.len(),
            stats = result.statistical_analysis.len(),
            slides = result.presentation_slides.len(),
            specimen_tasks = result.specimen_procedures.len(),
            "protocol extraction complete"
        );
        Ok(result)
    }
}

/// Build a complete [`ExtractionResult`] from raw tagged model output.
pub fn assemble_result(raw: &str) -> ExtractionResult {
    let sections = parse_sections(raw);

    ExtractionResult {
        narrative_text: strip_tagged_sections(raw),
        screening_items: normalize_checklist(&sections.screening_block),
        ae_guidelines: sections.ae_guidelines,
        summary: sections.summary,
        algorithm: sections.algorithm,
        drug_features: sections.drug_features,
        prep_requirements: sections.prep_requirements,
        statistical_analysis: sections.statistical_analysis,
        presentation_slides: sections.presentation_slides,
        specimen_procedures: sections.specimen_procedures,
        specimen_logistics: sections.specimen_logistics,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::MockGenerationClient;
    use crate::error::ExtractError;
    use crate::models::{SpecimenLogistics, StatisticalDataPoint};
    use crate::synthesizer::EMPTY_ANALYSIS_TEXT;

    const PDF: &[u8] = b"%PDF-1.7\n%fake protocol";

    fn extractor(mock: Arc<MockGenerationClient>) -> ProtocolExtractor {
        ProtocolExtractor::new(ResponseSynthesizer::new(mock))
    }

    #[tokio::test]
    async fn extracts_screening_and_stats_with_defaults_elsewhere() -> anyhow::Result<()> {
        let raw = "The protocol enrolls adults.\n\
                   SCREENING_LIST_START\n- Consent\n- Vitals\nSCREENING_LIST_END\n\
                   Visits are monthly.\n\
                   STAT_DATA_JSON_START[{\"label\":\"Alpha\",\"value\":0.05}]STAT_DATA_JSON_END";
        let mock = Arc::new(MockGenerationClient::new(raw));

        let result = extractor(mock.clone())
            .extract_protocol(PDF.to_vec(), "application/pdf")
            .await?;

        assert_eq!(result.screening_items, vec!["Consent", "Vitals"]);
        assert_eq!(
            result.statistical_analysis,
            vec![StatisticalDataPoint {
                label: "Alpha".to_string(),
                value: 0.05
            }]
        );
        assert_eq!(result.ae_guidelines, "Follow GCP guidelines.");
        assert_eq!(result.specimen_logistics, SpecimenLogistics::default());
        assert_eq!(
            result.narrative_text,
            "The protocol enrolls adults.\n\nVisits are monthly."
        );
        assert!(result.summary.is_empty());
        assert!(result.presentation_slides.is_empty());
        assert_eq!(mock.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn non_pdf_mime_type_never_reaches_the_model() {
        let mock = Arc::new(MockGenerationClient::new("unused"));

        let err = extractor(mock.clone())
            .extract_protocol(PDF.to_vec(), "image/png")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractError::Validation(ValidationError::UnsupportedMimeType(ref m)) if m == "image/png"
        ));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn transport_failure_fails_the_extraction() {
        let mock = Arc::new(MockGenerationClient::failing("timeout"));
        let err = extractor(mock)
            .extract_protocol(PDF.to_vec(), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Transport(_)));
    }

    #[tokio::test]
    async fn empty_reply_yields_fully_defaulted_result() -> anyhow::Result<()> {
        let mock = Arc::new(MockGenerationClient::silent());
        let result = extractor(mock)
            .extract_protocol(PDF.to_vec(), "application/pdf")
            .await?;

        assert_eq!(result.narrative_text, EMPTY_ANALYSIS_TEXT);
        assert_eq!(result.screening_items, vec!["Standard Screening"]);
        assert_eq!(result.ae_guidelines, "Follow GCP guidelines.");
        Ok(())
    }

    #[test]
    fn request_validation() {
        assert!(ExtractionRequest::new(PDF.to_vec(), "application/pdf").is_ok());
        assert!(ExtractionRequest::new(PDF.to_vec(), "Application/PDF; charset=binary").is_ok());
        assert_eq!(
            ExtractionRequest::new(Vec::new(), "application/pdf").unwrap_err(),
            ValidationError::EmptyDocument
        );
        assert_eq!(
            ExtractionRequest::new(b"PK\x03\x04docx".to_vec(), "application/pdf").unwrap_err(),
            ValidationError::NotPdf
        );
        assert_eq!(
            ExtractionRequest::new(PDF.to_vec(), "text/plain").unwrap_err(),
            ValidationError::UnsupportedMimeType("text/plain".to_string())
        );
    }

    #[test]
    fn assembled_narrative_has_no_tagged_spans() {
        let raw = "A AE_GUIDELINES_START x AE_GUIDELINES_END B";
        let result = assemble_result(raw);
        assert_eq!(result.narrative_text, "A  B");
        assert_eq!(strip_tagged_sections(&result.narrative_text), result.narrative_text);
    }
}
