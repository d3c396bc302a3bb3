// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The local backend adapter.
//!
//! Wraps an [`InferenceEngine`] behind the [`ChatBackend`] contract and offers
//! schema-constrained calls for the classifier and the PII detector.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use tandem_config::TandemConfig;
use tandem_config::model::LocalConfig;
use tandem_core::TandemError;
use tandem_core::traits::{ChatBackend, InferenceEngine, PartialSink, PluginAdapter};
use tandem_core::types::{Backend, ChatTurn, EngineRequest, HealthStatus};

use crate::engine::OllamaEngine;
use crate::progress::InitProgress;
use crate::structured;

/// Local backend adapter with a one-shot readiness slot.
///
/// Every call made before an engine is installed fails with
/// [`TandemError::EngineNotReady`]. Chat streams run one at a time: an engine
/// reports the final text of its most recent stream only.
pub struct LocalAdapter {
    engine: OnceCell<Arc<dyn InferenceEngine>>,
    chat_slot: Mutex<()>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl LocalAdapter {
    /// An adapter with chat settings taken from `config`; not yet ready.
    pub fn new(config: &TandemConfig) -> Self {
        Self::with_settings(
            config.agent.system_prompt.clone(),
            config.local.temperature,
            config.local.max_tokens,
        )
    }

    pub fn with_settings(system_prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            engine: OnceCell::new(),
            chat_slot: Mutex::new(()),
            system_prompt: system_prompt.into(),
            temperature,
            max_tokens,
        }
    }

    /// Load an [`OllamaEngine`] and install it. Concurrent callers share one load;
    /// once installed, later calls return immediately.
    pub async fn initialize<F>(&self, config: &LocalConfig, on_progress: F) -> Result<(), TandemError>
    where
        F: Fn(InitProgress) + Send + Sync,
    {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let engine = OllamaEngine::load(config, on_progress).await?;
                Ok::<_, TandemError>(Arc::new(engine) as Arc<dyn InferenceEngine>)
            })
            .await?;
        info!(model = engine.model_id(), "local engine ready");
        Ok(())
    }

    /// Install an already-built engine.
    pub fn install(&self, engine: Arc<dyn InferenceEngine>) -> Result<(), TandemError> {
        self.engine
            .set(engine)
            .map_err(|_| TandemError::Internal("local engine is already installed".to_string()))
    }

    pub fn is_ready(&self) -> bool {
        self.engine.initialized()
    }

    fn engine(&self) -> Result<&Arc<dyn InferenceEngine>, TandemError> {
        self.engine.get().ok_or(TandemError::EngineNotReady)
    }

    /// Ask the engine for a JSON value of type `T`.
    ///
    /// The request carries `T`'s JSON schema; the reply is parsed with
    /// best-effort extraction. A reply with no usable JSON is a
    /// [`TandemError::StreamParse`] carrying a prefix of the raw text.
    pub async fn structured<T>(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<T, TandemError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let engine = self.engine()?;
        let request = EngineRequest {
            messages: vec![ChatTurn::system(system), ChatTurn::user(prompt)],
            temperature,
            max_tokens,
            response_format: Some(structured::response_format_for::<T>()?),
        };

        let reply = engine.complete(request).await?;
        debug!(len = reply.len(), "structured reply received");
        structured::extract_json(&reply).ok_or_else(|| {
            let preview: String = reply.chars().take(80).collect();
            TandemError::StreamParse(format!("no usable JSON in model output: {preview:?}"))
        })
    }
}

#[async_trait]
impl PluginAdapter for LocalAdapter {
    fn name(&self) -> &str {
        "local"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn backend(&self) -> Backend {
        Backend::Local
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        Ok(match self.engine.get() {
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Degraded("local model is still loading".to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), TandemError> {
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for LocalAdapter {
    async fn complete(
        &self,
        history: &[ChatTurn],
        on_partial: PartialSink<'_>,
    ) -> Result<String, TandemError> {
        let engine = self.engine()?;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatTurn::system(self.system_prompt.clone()));
        messages.extend_from_slice(history);

        let request = EngineRequest {
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: None,
        };

        // Held until the final message is read, so another turn's stream
        // cannot replace it.
        let _slot = self.chat_slot.lock().await;
        let mut chunks = engine.stream_chat(request).await?;
        let mut buffer = String::new();
        while let Some(chunk) = chunks.next().await {
            buffer.push_str(&chunk?.delta);
            on_partial(&buffer);
        }

        let final_text = engine.final_message().await?;
        if final_text != buffer {
            debug!(
                streamed = buffer.len(),
                authoritative = final_text.len(),
                "final message differs from streamed text"
            );
        }
        on_partial(&final_text);
        Ok(final_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tandem_test_utils::{MockEngine, MockReply};

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Verdict {
        ok: bool,
    }

    fn adapter_with(engine: MockEngine) -> (LocalAdapter, Arc<MockEngine>) {
        let engine = Arc::new(engine);
        let adapter = LocalAdapter::with_settings("You are a helpful AI assistant.", 0.7, 1000);
        adapter.install(engine.clone()).unwrap();
        (adapter, engine)
    }

    #[tokio::test]
    async fn calls_before_install_are_not_ready() {
        let adapter = LocalAdapter::with_settings("sys", 0.7, 100);
        assert!(!adapter.is_ready());

        let mut sink = |_: &str| {};
        let err = adapter.complete(&[ChatTurn::user("hi")], &mut sink).await.unwrap_err();
        assert!(matches!(err, TandemError::EngineNotReady));

        let err = adapter
            .structured::<Verdict>("sys", "hi", 0.0, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, TandemError::EngineNotReady));

        assert!(matches!(
            adapter.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }

    #[tokio::test]
    async fn partials_accumulate_then_final_overrides() {
        let engine = MockEngine::with_replies([MockReply::chunks(["Hel", "lo wor", "ld"])]);
        engine.set_final_message("Hello world!");
        let (adapter, engine) = adapter_with(engine);

        let mut seen = Vec::new();
        let mut sink = |text: &str| seen.push(text.to_string());
        let out = adapter
            .complete(&[ChatTurn::user("greet me")], &mut sink)
            .await
            .unwrap();

        assert_eq!(out, "Hello world!");
        assert_eq!(seen, vec!["Hel", "Hello wor", "Hello world", "Hello world!"]);

        let sent = &engine.requests()[0];
        assert_eq!(sent.messages[0], ChatTurn::system("You are a helpful AI assistant."));
        assert_eq!(sent.messages[1], ChatTurn::user("greet me"));
        assert_eq!(sent.max_tokens, 1000);
        assert!(sent.response_format.is_none());
    }

    #[tokio::test]
    async fn structured_parses_and_sends_schema() {
        let (adapter, engine) =
            adapter_with(MockEngine::with_replies([MockReply::text("Result: {\"ok\": true}")]));

        let verdict: Verdict = adapter.structured("judge", "is it ok?", 0.1, 200).await.unwrap();
        assert!(verdict.ok);

        let sent = &engine.requests()[0];
        assert_eq!(sent.messages, vec![ChatTurn::system("judge"), ChatTurn::user("is it ok?")]);
        assert_eq!(sent.max_tokens, 200);
        let schema = &sent.response_format.as_ref().unwrap().schema;
        assert!(schema.contains("\"ok\""));
    }

    #[tokio::test]
    async fn structured_garbage_is_a_parse_error() {
        let (adapter, _) = adapter_with(MockEngine::with_replies([MockReply::text("I cannot.")]));
        let err = adapter
            .structured::<Verdict>("judge", "x", 0.1, 200)
            .await
            .unwrap_err();
        assert!(matches!(err, TandemError::StreamParse(_)));
    }

    #[tokio::test]
    async fn overlapping_chats_each_get_their_own_reply() {
        let engine = MockEngine::with_responder(|req| {
            match req.messages.last().map(|m| m.content.as_str()) {
                Some("first") => MockReply::chunks(["al", "ph", "a"]),
                _ => MockReply::chunks(["be", "ta"]),
            }
        });
        let (adapter, engine) = adapter_with(engine);

        let mut first_seen = Vec::new();
        let mut second_seen = Vec::new();
        let mut first_sink = |text: &str| first_seen.push(text.to_string());
        let mut second_sink = |text: &str| second_seen.push(text.to_string());
        let first_history = [ChatTurn::user("first")];
        let second_history = [ChatTurn::user("second")];

        let (first, second) = tokio::join!(
            adapter.complete(&first_history, &mut first_sink),
            adapter.complete(&second_history, &mut second_sink),
        );

        assert_eq!(first.unwrap(), "alpha");
        assert_eq!(second.unwrap(), "beta");
        assert!(first_seen.iter().all(|p| "alpha".starts_with(p.as_str())));
        assert!(second_seen.iter().all(|p| "beta".starts_with(p.as_str())));
        assert_eq!(engine.requests().len(), 2);
    }

    #[tokio::test]
    async fn engine_final_message_follows_latest_stream() {
        let engine = MockEngine::with_responder(|req| {
            match req.messages.last().map(|m| m.content.as_str()) {
                Some("first") => MockReply::chunks(["al", "pha"]),
                _ => MockReply::chunks(["be", "ta"]),
            }
        });
        let request = |text: &str| EngineRequest {
            messages: vec![ChatTurn::user(text)],
            temperature: 0.0,
            max_tokens: 10,
            response_format: None,
        };
        let mut first = engine.stream_chat(request("first")).await.unwrap();
        let second = engine.stream_chat(request("second")).await.unwrap();
        let _: Vec<_> = second.collect().await;
        while first.next().await.is_some() {}
        assert_eq!(engine.final_message().await.unwrap(), "beta");
    }

    #[test]
    fn second_install_is_rejected() {
        let (adapter, _) = adapter_with(MockEngine::new());
        assert!(adapter.install(Arc::new(MockEngine::new())).is_err());
        assert!(adapter.is_ready());
    }
}
