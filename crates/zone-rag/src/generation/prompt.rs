//! Prompt templates for zone questions

use crate::types::ZoneCode;

/// Prompt builder for zone queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the grounding prompt: question, evidence verbatim, extraction instructions
    pub fn build_zone_prompt(zone: &ZoneCode, question: &str, evidence: &str) -> String {
        format!(
            r#"Based on the following Auckland Council planning document for zone {zone}, please answer this question: {question}

Planning Document Content:
{evidence}

Please provide specific information from the document, including exact measurements, percentages, and requirements where available. Focus on building rules, height restrictions, site coverage, setbacks, and consent requirements.
Use ONLY the planning document content above. If the answer is not in that content, say that the document does not state it.
"#,
            zone = zone,
            question = question,
            evidence = evidence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_question_and_evidence_verbatim() {
        let evidence = "H3.6.5 Building height\n(1) Buildings must not exceed 8m in height.";
        let prompt = PromptBuilder::build_zone_prompt(
            &ZoneCode::new("H3"),
            "What is the maximum building height?",
            evidence,
        );

        assert!(prompt.contains("zone H3"));
        assert!(prompt.contains("please answer this question: What is the maximum building height?"));
        assert!(prompt.contains(evidence));
        assert!(prompt.contains("exact measurements, percentages"));
        assert!(prompt.contains("Use ONLY"));
    }
}
