// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn backend selection.
//!
//! Precedence: explicit tag > word-count override > complexity classifier.
//! The result is resolved once per turn, before any side effect begins.

use std::sync::Arc;

use tracing::info;

use tandem_config::model::RoutingConfig;
use tandem_core::TandemError;
use tandem_core::types::{Backend, RoutingDecision};
use tandem_local::LocalAdapter;

use crate::classifier::ComplexityClassifier;
use crate::tags::{BackendTags, word_count};

/// Why a backend was chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteChoice {
    /// The user named a backend with a tag.
    Explicit { backend: Backend },
    /// The prompt is longer than the word threshold.
    WordCount { words: usize, threshold: usize },
    /// The complexity classifier decided.
    Classified {
        backend: Backend,
        score: Option<u8>,
        explanation: String,
    },
}

impl RouteChoice {
    pub fn backend(&self) -> Backend {
        match self {
            RouteChoice::Explicit { backend } | RouteChoice::Classified { backend, .. } => *backend,
            RouteChoice::WordCount { .. } => Backend::Remote,
        }
    }

    /// Human-readable reason for the choice.
    pub fn reason(&self) -> String {
        match self {
            RouteChoice::Explicit { backend } => {
                format!("Explicitly requested the {backend} model")
            }
            RouteChoice::WordCount { threshold, .. } => format!(
                "Prompt exceeds {threshold} words, using the remote model for better handling of long prompts"
            ),
            RouteChoice::Classified { explanation, .. } => explanation.clone(),
        }
    }

    pub fn to_decision(&self) -> RoutingDecision {
        RoutingDecision {
            use_remote: self.backend() == Backend::Remote,
            reason: self.reason(),
        }
    }
}

/// A routed turn: the choice plus the text to forward to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub choice: RouteChoice,
    /// The input with any backend tag removed.
    pub text: String,
}

/// Selects a backend for each user turn.
pub struct ModelRouter {
    tags: BackendTags,
    word_threshold: usize,
    classifier: ComplexityClassifier,
}

impl ModelRouter {
    pub fn new(local: Arc<LocalAdapter>, config: &RoutingConfig) -> Self {
        Self {
            tags: BackendTags::new(config.remote_tag.clone(), config.local_tag.clone()),
            word_threshold: config.word_threshold,
            classifier: ComplexityClassifier::new(local, config),
        }
    }

    /// Route `raw` user input.
    ///
    /// Fails only when classification is needed and the local engine is not
    /// ready.
    pub async fn route(&self, raw: &str) -> Result<Route, TandemError> {
        if let Some((backend, text)) = self.tags.detect(raw) {
            info!(%backend, "explicit backend tag");
            return Ok(Route {
                choice: RouteChoice::Explicit { backend },
                text,
            });
        }

        let text = raw.trim().to_string();
        let words = word_count(raw);
        if words > self.word_threshold {
            info!(words, threshold = self.word_threshold, "long prompt, routing remote");
            return Ok(Route {
                choice: RouteChoice::WordCount {
                    words,
                    threshold: self.word_threshold,
                },
                text,
            });
        }

        let classification = self.classifier.classify(raw).await?;
        let backend = if classification.use_remote {
            Backend::Remote
        } else {
            Backend::Local
        };
        info!(%backend, score = ?classification.score, "prompt classified");
        Ok(Route {
            choice: RouteChoice::Classified {
                backend,
                score: classification.score,
                explanation: classification.explanation,
            },
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_test_utils::{MockEngine, MockReply};

    fn router_with(engine: Option<Arc<MockEngine>>) -> ModelRouter {
        let local = Arc::new(LocalAdapter::with_settings("sys", 0.7, 1000));
        if let Some(engine) = engine {
            local.install(engine).unwrap();
        }
        ModelRouter::new(local, &RoutingConfig::default())
    }

    fn scoring(score: u8) -> Arc<MockEngine> {
        Arc::new(MockEngine::with_replies([MockReply::text(format!(
            r#"{{"score": {score}, "explanation": "scored {score}"}}"#
        ))]))
    }

    #[tokio::test]
    async fn tag_skips_classification() {
        let engine = scoring(1);
        let router = router_with(Some(engine.clone()));
        let route = router.route("hello @Remote there").await.unwrap();
        assert_eq!(route.choice, RouteChoice::Explicit { backend: Backend::Remote });
        assert_eq!(route.text, "hello there");
        assert!(engine.requests().is_empty());
    }

    #[tokio::test]
    async fn tag_works_before_engine_is_ready() {
        let router = router_with(None);
        let route = router.route("@local hi").await.unwrap();
        assert_eq!(route.choice.backend(), Backend::Local);
        assert_eq!(route.text, "hi");
    }

    #[tokio::test]
    async fn long_prompt_routes_remote_without_classifier() {
        let engine = scoring(1);
        let router = router_with(Some(engine.clone()));
        let prompt = vec!["word"; 101].join(" ");
        let route = router.route(&prompt).await.unwrap();
        assert_eq!(route.choice.backend(), Backend::Remote);
        assert!(matches!(route.choice, RouteChoice::WordCount { words: 101, threshold: 100 }));
        assert!(route.choice.reason().contains("exceeds 100 words"));
        assert!(engine.requests().is_empty());
    }

    #[tokio::test]
    async fn long_prompt_wins_over_unready_engine() {
        let router = router_with(None);
        let prompt = vec!["word"; 150].join(" ");
        assert_eq!(router.route(&prompt).await.unwrap().choice.backend(), Backend::Remote);
    }

    #[tokio::test]
    async fn exactly_threshold_words_is_classified() {
        let engine = scoring(4);
        let router = router_with(Some(engine.clone()));
        let prompt = vec!["word"; 100].join(" ");
        let route = router.route(&prompt).await.unwrap();
        assert!(matches!(route.choice, RouteChoice::Classified { .. }));
        assert_eq!(engine.requests().len(), 1);
    }

    #[tokio::test]
    async fn classifier_decides_short_prompts() {
        let router = router_with(Some(scoring(4)));
        let route = router.route("  design a cache  ").await.unwrap();
        assert_eq!(route.text, "design a cache");
        let decision = route.choice.to_decision();
        assert!(decision.use_remote);
        assert_eq!(decision.reason, "scored 4");

        let router = router_with(Some(scoring(2)));
        let route = router.route("hi").await.unwrap();
        assert_eq!(
            route.choice,
            RouteChoice::Classified {
                backend: Backend::Local,
                score: Some(2),
                explanation: "scored 2".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn classifier_fallback_routes_local() {
        let engine = Arc::new(MockEngine::with_replies([MockReply::text("no idea")]));
        let router = router_with(Some(engine));
        let route = router.route("hi").await.unwrap();
        assert_eq!(route.choice.backend(), Backend::Local);
        assert!(!route.choice.to_decision().use_remote);
    }

    #[tokio::test]
    async fn unready_engine_fails_classification() {
        let router = router_with(None);
        let err = router.route("hi").await.unwrap_err();
        assert!(matches!(err, TandemError::EngineNotReady));
    }
}
