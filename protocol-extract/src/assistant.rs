use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::synthesizer::{ASSISTANT_ERROR_FALLBACK, ResponseSynthesizer};

/// Key under which the loaded protocol narrative is attached to the study
/// context sent to the model.
pub const NARRATIVE_CONTEXT_KEY: &str = "protocolInsightContent";

/// Answers coordinator questions about a single study.
#[derive(Clone)]
pub struct StudyAssistant {
    synthesizer: ResponseSynthesizer,
}

impl StudyAssistant {
    pub fn new(synthesizer: ResponseSynthesizer) -> Self {
        Self { synthesizer }
    }

    /// Serialize `study` (plus the protocol narrative, when one is loaded) and
    /// ask the model. Always returns text; failures come back as the
    /// assistant's fallback sentences.
    pub async fn answer_about_study<S: Serialize>(
        &self,
        study: &S,
        protocol_narrative: Option<&str>,
        question: &str,
    ) -> String {
        let context = match study_context(study, protocol_narrative) {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "could not serialize study context");
                return ASSISTANT_ERROR_FALLBACK.to_string();
            }
        };

        debug!(context_chars = context.len(), "asking study assistant");
        self.synthesizer.answer_query(&context, question).await
    }
}

/// The JSON context blob for a study question.
pub fn study_context<S: Serialize>(
    study: &S,
    protocol_narrative: Option<&str>,
) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(study)?;
    if let (Some(narrative), Value::Object(map)) = (protocol_narrative, &mut value) {
        map.insert(
            NARRATIVE_CONTEXT_KEY.to_string(),
            Value::String(narrative.to_string()),
        );
    }
    serde_json::to_string(&value)
}
