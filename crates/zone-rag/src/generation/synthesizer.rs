//! Answer synthesis from selected evidence

use std::sync::Arc;

use crate::error::{Error, Result, SynthesisErrorKind};
use crate::providers::CompletionProvider;
use crate::retrieval::Evidence;
use crate::types::{Answer, ZoneCode};

use super::prompt::PromptBuilder;

/// Turns evidence into an answer with one completion call
pub struct AnswerSynthesizer {
    completion: Arc<dyn CompletionProvider>,
}

impl AnswerSynthesizer {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }

    pub fn model(&self) -> &str {
        self.completion.model()
    }

    /// Call the completion service exactly once
    ///
    /// The answer's content is not validated; only an empty reply is rejected.
    pub async fn synthesize(
        &self,
        zone: &ZoneCode,
        question: &str,
        evidence: &Evidence,
    ) -> Result<Answer> {
        let prompt = PromptBuilder::build_zone_prompt(zone, question, &evidence.text);

        tracing::info!(
            "Synthesizing answer for zone {} with {} ({} evidence chars, {})",
            zone,
            self.completion.name(),
            evidence.char_len(),
            evidence.strategy
        );

        let text = self.completion.complete(&prompt).await?;
        if text.trim().is_empty() {
            return Err(Error::synthesis(
                SynthesisErrorKind::InvalidResponse,
                "completion service returned an empty answer",
            ));
        }

        Ok(Answer {
            zone: zone.clone(),
            question: question.to_string(),
            text,
        })
    }
}
