use std::fmt::Write as _;

use crate::fields::SECTIONS;

/// Compliance preamble sent as the system instruction on every request.
pub const COMPLIANCE_INSTRUCTION: &str = "\
IMPORTANT: You are operating in a HIPAA-compliant clinical environment.
1. NEVER request, use, or store real patient names, social security numbers, or addresses.
2. Use ONLY Participant IDs or Subject Codes (e.g., SUB-001).
3. If provided with PII (Personally Identifiable Information), immediately redact it and notify the user to follow protocol.
4. Focus strictly on clinical trial logistics, medical data analysis, and protocol adherence.";

const EXTRACTION_CATEGORIES: &str = "\
You are an expert Clinical Research Coordinator and Lab Manager. Analyze this study protocol PDF and extract:

1. **Protocol Summary**: A layman's summary.
2. **Study Algorithm**: Step-by-step logic flow.
3. **Drug/Device Features**: Tech details.
4. **Preparation Requirements**: Pharm prep steps.
5. **Statistical Analysis Data**: Alpha, Power, Effect Size, Sample Size.
6. **Presentation Slides**: Bullets for 5 slides.
7. **Specimen Processing & Handling**: A list of tasks for lab techs (e.g., centrifugation, storage temp).
8. **Shipping Logistics**: Shipping address, Courier name, and Courier contact information/phone.

Also list the screening procedures one per line, and the adverse-event reporting guidelines.
";

/// The instruction that accompanies an uploaded protocol document.
///
/// The tag lines are rendered from the parser's section table.
pub fn extraction_instruction() -> String {
    let mut prompt = String::from(EXTRACTION_CATEGORIES);
    prompt.push_str("\nI need you to encapsulate specific sections for the UI using these exact tags:\n");

    for section in SECTIONS {
        let _ = write!(prompt, "- '{}' ... '{}'", section.start_tag, section.end_tag);
        if let Some(hint) = section.shape_hint {
            let _ = write!(prompt, " ({hint})");
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "\nEmit each tagged section exactly once. Inside JSON sections output raw JSON only.\n",
    );
    prompt
}

/// The user turn for a question about a study.
pub fn query_prompt(study_context_json: &str, question: &str) -> String {
    format!(
        "Context: You are a senior clinical trial research analyst.
Study Data: {study_context_json}
User Question: {question}

Please provide a concise, data-driven insight based strictly on the study data provided."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_instruction_lists_every_tag() {
        let prompt = extraction_instruction();
        for section in SECTIONS {
            assert!(prompt.contains(section.start_tag), "missing {}", section.start_tag);
            assert!(prompt.contains(section.end_tag), "missing {}", section.end_tag);
        }
        assert!(prompt.contains("JSON object of {address, courier, courierContact}"));
    }

    #[test]
    fn query_prompt_embeds_context_and_question() {
        let prompt = query_prompt(r#"{"id":"TRIAL-001"}"#, "How many enrolled?");
        assert!(prompt.contains(r#"Study Data: {"id":"TRIAL-001"}"#));
        assert!(prompt.contains("User Question: How many enrolled?"));
    }
}
