use chrono::Utc;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, trace};

use crate::classifier::Classifier;
use crate::errors::MentorError;
use crate::prompt::{self, DESCRIPTION_VAR};
use crate::provider::Provider;
use crate::wire::{Description, Exchange, GateOutcome, Verdict};

/// Literal the model is told to answer with when it rejects a description.
pub const SENTINEL: &str = "FLAG";

pub const STAGE: &str = "validation";

/// Decides whether a description may enter the pipeline.
pub struct Gate<'a> {
    provider: &'a dyn Provider,
    classifier: &'a dyn Classifier,
}

impl<'a> Gate<'a> {
    pub fn new(provider: &'a dyn Provider, classifier: &'a dyn Classifier) -> Self {
        Self {
            provider,
            classifier,
        }
    }

    /// Runs the local classifier, then one model completion. Both signals are
    /// always computed. Errors from either abort the evaluation.
    pub async fn evaluate(&self, description: &Description) -> Result<GateOutcome, MentorError> {
        let classifier_flagged = self.classifier.is_sensitive(description.as_str())?;

        let vars = HashMap::from([(DESCRIPTION_VAR, description.as_str())]);
        let prompt_text = prompt::VALIDATION.render(&vars)?;
        trace!(prompt = %prompt_text, "validation prompt");

        let started = Instant::now();
        let timestamp = Utc::now();
        let response = self
            .provider
            .complete(&prompt_text)
            .await
            .map_err(|e| MentorError::provider(STAGE, e))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let model_flagged = is_sentinel(&response);
        let verdict = Verdict::combine(classifier_flagged, model_flagged);
        info!(
            classifier_flagged,
            model_flagged,
            ?verdict,
            elapsed_ms,
            "gate verdict"
        );

        Ok(GateOutcome {
            verdict,
            classifier_flagged,
            model_flagged,
            exchange: Exchange {
                stage: STAGE.to_string(),
                prompt: prompt_text,
                response,
                elapsed_ms,
                timestamp,
            },
        })
    }
}

/// Trimmed, case-folded exact match. "FLAG." and quoted forms do not count.
pub fn is_sentinel(response: &str) -> bool {
    response.trim().to_lowercase() == SENTINEL.to_lowercase()
}
