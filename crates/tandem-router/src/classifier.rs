// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-backed prompt complexity classification.
//!
//! Asks the local model for a `{score, explanation}` object at low temperature
//! with a bounded output length. The score is clamped to the configured range
//! and compared with the threshold. Anything short of a usable score falls back
//! to the local backend; only [`TandemError::EngineNotReady`] propagates.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use tandem_config::model::RoutingConfig;
use tandem_core::TandemError;
use tandem_local::LocalAdapter;

/// Reply shape requested from the model.
#[derive(Debug, Deserialize, JsonSchema)]
struct ComplexityScore {
    /// How demanding the request is.
    score: f64,
    /// One sentence justifying the score.
    explanation: String,
}

/// Outcome of classifying one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub use_remote: bool,
    /// Clamped score, or `None` when the fallback was taken.
    pub score: Option<u8>,
    pub explanation: String,
}

/// Scores prompts with the local model.
pub struct ComplexityClassifier {
    local: Arc<LocalAdapter>,
    min_score: u8,
    max_score: u8,
    threshold: u8,
    temperature: f32,
    max_tokens: u32,
}

impl ComplexityClassifier {
    pub fn new(local: Arc<LocalAdapter>, config: &RoutingConfig) -> Self {
        Self {
            local,
            min_score: config.min_score,
            max_score: config.max_score,
            threshold: config.score_threshold,
            temperature: config.classifier_temperature,
            max_tokens: config.classifier_max_tokens,
        }
    }

    /// Classify `prompt`.
    ///
    /// Fails only with [`TandemError::EngineNotReady`]; every other failure
    /// yields a local decision whose explanation names the failure.
    pub async fn classify(&self, prompt: &str) -> Result<Classification, TandemError> {
        if !self.local.is_ready() {
            return Err(TandemError::EngineNotReady);
        }

        let system = self.system_prompt();
        let reply = self
            .local
            .structured::<ComplexityScore>(&system, prompt, self.temperature, self.max_tokens)
            .await;

        match reply {
            Ok(reply) => Ok(self.decide(reply)),
            Err(TandemError::EngineNotReady) => Err(TandemError::EngineNotReady),
            Err(e) => {
                let failure = TandemError::Classification(e.to_string());
                warn!(error = %failure, "complexity classification failed, routing local");
                Ok(Classification {
                    use_remote: false,
                    score: None,
                    explanation: format!("Classification unavailable ({e}); using local model"),
                })
            }
        }
    }

    fn decide(&self, reply: ComplexityScore) -> Classification {
        let score = self.clamp(reply.score);
        let use_remote = score >= self.threshold;
        debug!(raw = reply.score, score, use_remote, "prompt classified");
        Classification {
            use_remote,
            score: Some(score),
            explanation: reply.explanation.trim().to_string(),
        }
    }

    /// Rounds and clamps into `min_score..=max_score`; NaN maps to the minimum.
    fn clamp(&self, raw: f64) -> u8 {
        let (lo, hi) = (f64::from(self.min_score), f64::from(self.max_score));
        if raw.is_nan() {
            return self.min_score;
        }
        raw.round().clamp(lo, hi) as u8
    }

    fn system_prompt(&self) -> String {
        format!(
            "You decide whether a chat request needs a large remote model or can be answered by a \
             small local model. Rate the request from {min} to {max}, where {min} is a greeting or \
             a simple factual question and {max} needs multi-step reasoning, long-form writing, \
             code or specialist knowledge. Respond only with JSON of the form \
             {{\"score\": <number>, \"explanation\": \"<one sentence>\"}}.",
            min = self.min_score,
            max = self.max_score,
        )
    }
}
