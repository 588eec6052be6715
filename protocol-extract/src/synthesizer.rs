use std::sync::Arc;

use tracing::{error, info};

use crate::client::{GenerationClient, GenerationRequest};
use crate::error::Result;
use crate::prompts::{COMPLIANCE_INSTRUCTION, extraction_instruction, query_prompt};

/// Returned when the model answered a question without any text.
pub const NO_INSIGHT_FALLBACK: &str = "I'm sorry, I couldn't generate an insight for that query.";

/// Returned when the generation service could not be reached for a question.
pub const ASSISTANT_ERROR_FALLBACK: &str = "Error communicating with the AI Research Assistant.";

/// Raw text used when document analysis came back empty.
pub const EMPTY_ANALYSIS_TEXT: &str = "Failed to analyze the protocol.";

/// Builds prompts for the two kinds of model call and interprets the replies.
#[derive(Clone)]
pub struct ResponseSynthesizer {
    client: Arc<dyn GenerationClient>,
}

impl ResponseSynthesizer {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Ask a question about a study. Never fails: transport errors and empty
    /// replies become fallback sentences.
    pub async fn answer_query(&self, study_context_json: &str, question: &str) -> String {
        let request =
            GenerationRequest::text(COMPLIANCE_INSTRUCTION, query_prompt(study_context_json, question));

        match self.client.generate(request).await {
            Ok(response) => response
                .text
                .unwrap_or_else(|| NO_INSIGHT_FALLBACK.to_string()),
            Err(e) => {
                error!(error = %e, "study query failed");
                ASSISTANT_ERROR_FALLBACK.to_string()
            }
        }
    }

    /// Send a protocol document for structured analysis and return the raw
    /// tagged reply. Transport failures propagate.
    pub async fn analyze_document(&self, document: &[u8], mime_type: &str) -> Result<String> {
        info!(bytes = document.len(), mime_type, "submitting document for analysis");

        let request = GenerationRequest::document(
            COMPLIANCE_INSTRUCTION,
            mime_type,
            document.to_vec(),
            extraction_instruction(),
        );
        let response = self.client.generate(request).await?;

        Ok(response
            .text
            .unwrap_or_else(|| EMPTY_ANALYSIS_TEXT.to_string()))
    }
}
