//! Supplementary free-text insight from a generative model.
//!
//! The insight is advisory. It is never parsed into the result schema and never
//! influences which branch the pipeline takes.

use crate::llm_provider::{GenerationConfig, LLMProvider};
use dottie_core::{LLMConfig, Result, SymptomInput, TriageError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub struct DiagnosticAugmenter {
    provider: Arc<dyn LLMProvider>,
    generation: GenerationConfig,
    timeout: Duration,
}

impl DiagnosticAugmenter {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            generation: GenerationConfig::default(),
            timeout,
        }
    }

    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &LLMConfig) -> Self {
        Self {
            provider,
            generation: GenerationConfig {
                temperature: config.temperature,
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Ask the model for insight on the request. Transport failure, timeout and empty
    /// output all surface as [`TriageError::Augmentation`].
    pub async fn augment(&self, input: &SymptomInput) -> Result<String> {
        self.augment_within(input, self.timeout).await
    }

    /// Like [`augment`](Self::augment), with the call bounded by the shorter of the
    /// configured timeout and `budget`.
    #[instrument(skip(self, input), fields(provider = self.provider.provider_name()))]
    pub async fn augment_within(&self, input: &SymptomInput, budget: Duration) -> Result<String> {
        let limit = self.timeout.min(budget);
        let prompt = build_prompt(input);
        debug!(prompt_len = prompt.len(), limit_ms = limit.as_millis() as u64, "requesting model insight");

        let response = tokio::time::timeout(
            limit,
            self.provider.generate_with_config(&prompt, &self.generation),
        )
        .await
        .map_err(|_| {
            warn!(timeout_ms = limit.as_millis() as u64, "model call timed out");
            TriageError::Augmentation(format!(
                "model did not answer within {} ms",
                limit.as_millis()
            ))
        })?
        .map_err(|e| TriageError::Augmentation(format!("{:#}", e)))?;

        let insight = strip_code_fences(&response.content);
        if insight.is_empty() {
            return Err(TriageError::Augmentation("model returned no text".into()));
        }
        debug!(
            model = %response.model,
            tokens = ?response.total_tokens,
            "model insight received"
        );
        Ok(insight.to_string())
    }
}

pub fn build_prompt(input: &SymptomInput) -> String {
    let symptoms = if input.symptoms.is_empty() {
        "none reported".to_string()
    } else {
        input.symptoms.join(", ")
    };
    let flow = if input.flow.trim().is_empty() {
        "not reported"
    } else {
        input.flow.trim()
    };

    format!(
        "A {age}-year-old reports a menstrual cycle length of {length} days, \
         a period duration of {duration} days and {flow} flow. \
         Reported symptoms: {symptoms}. \
         Generate 5 insights in terms of possible diagnosis, a description of the diagnosis \
         related to the symptoms, and their probability ranging from low to high.",
        age = input.age,
        length = input.cycle_length,
        duration = input.cycle_duration,
        flow = flow,
        symptoms = symptoms,
    )
}

/// Removes a surrounding Markdown code fence, with or without a language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) if !rest[..idx].trim().contains(char::is_whitespace) => &rest[idx + 1..],
        Some(_) => rest,
        None => rest.strip_prefix("json").unwrap_or(rest),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
