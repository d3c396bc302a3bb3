// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`InferenceEngine`] backed by a local Ollama daemon.
//!
//! Endpoints used:
//! - `POST /api/show` - is the model already present?
//! - `POST /api/pull` - download the model (NDJSON progress)
//! - `POST /api/chat` - chat completion (NDJSON when streamed)

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use tandem_config::model::LocalConfig;
use tandem_core::TandemError;
use tandem_core::traits::{ChunkStream, InferenceEngine};
use tandem_core::types::{EngineChunk, EngineRequest};

use crate::ndjson;
use crate::progress::{InitProgress, ProgressClock};
use crate::types::{
    ChatOptions, ChatRequest, ChatResponse, ErrorBody, PullProgressLine, PullRequest,
    ShowRequest,
};

/// A loaded model served by an Ollama daemon.
#[derive(Debug)]
pub struct OllamaEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    num_ctx: Option<u32>,
    low_vram: bool,
    last_message: Arc<Mutex<String>>,
}

impl OllamaEngine {
    /// Make the configured model available and return an engine serving it.
    ///
    /// With `use_cache` set, a model the daemon already has is used as is;
    /// otherwise (or when it is missing) the model is pulled, with every pull
    /// status line forwarded to `on_progress`.
    pub async fn load<F>(config: &LocalConfig, on_progress: F) -> Result<Self, TandemError>
    where
        F: Fn(InitProgress) + Send + Sync,
    {
        let mut clock = ProgressClock::start();
        let engine = Self::connect(config)?;

        if let Some(lib) = &config.model_lib {
            debug!(model_lib = %lib, "model library recorded; the daemon provides its own runtime");
        }

        on_progress(clock.report(Some(0.0), format!("Loading {}", engine.model)));

        if config.use_cache && engine.is_present().await? {
            info!(model = %engine.model, "local model found in cache");
            on_progress(clock.report(Some(1.0), "Loaded model from cache"));
            return Ok(engine);
        }

        engine.pull(&mut clock, &on_progress).await?;
        info!(model = %engine.model, "local model pulled");
        on_progress(clock.report(Some(1.0), "Finished loading model"));
        Ok(engine)
    }

    /// Whether the daemon answers and already has the configured model.
    ///
    /// Never pulls. An unreachable daemon is an error.
    pub async fn probe(config: &LocalConfig) -> Result<bool, TandemError> {
        Self::connect(config)?.is_present().await
    }

    fn connect(config: &LocalConfig) -> Result<Self, TandemError> {
        let client = reqwest::Client::builder().build().map_err(|e| TandemError::Backend {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: model_reference(config),
            num_ctx: config.context_window_size,
            low_vram: resolve_low_resource(config, available_memory_mb()),
            last_message: Arc::new(Mutex::new(String::new())),
        })
    }

    async fn is_present(&self) -> Result<bool, TandemError> {
        let response = self
            .client
            .post(self.url("/api/show"))
            .json(&ShowRequest { model: &self.model })
            .send()
            .await
            .map_err(request_failed)?;
        debug!(status = %response.status(), "model presence check");
        Ok(response.status().is_success())
    }

    async fn pull<F>(&self, clock: &mut ProgressClock, on_progress: &F) -> Result<(), TandemError>
    where
        F: Fn(InitProgress) + Send + Sync,
    {
        let response = self
            .post(
                "/api/pull",
                &PullRequest {
                    model: &self.model,
                    stream: true,
                },
            )
            .await?;

        let mut lines = Box::pin(ndjson::decode::<PullProgressLine, _, _>(Box::pin(
            response.bytes_stream(),
        )));
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(TandemError::StreamParse(detail)) => {
                    warn!(%detail, "skipping malformed pull status line");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Some(error) = line.error {
                return Err(TandemError::backend(format!(
                    "failed to pull {}: {error}",
                    self.model
                )));
            }
            on_progress(clock.report(line.fraction(), line.status));
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, TandemError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        debug!(%status, path, "local engine response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("local engine returned {status}"));
        Err(TandemError::backend(message))
    }

    fn chat_request<'a>(&'a self, request: &'a EngineRequest, stream: bool) -> ChatRequest<'a> {
        let format = request.response_format.as_ref().map(|f| {
            serde_json::from_str(&f.schema).unwrap_or_else(|e| {
                warn!(error = %e, "response schema is not JSON, requesting plain JSON");
                serde_json::Value::String("json".to_string())
            })
        });
        ChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream,
            format,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                num_ctx: self.num_ctx,
                low_vram: self.low_vram,
            },
        }
    }

    fn record(&self) -> std::sync::MutexGuard<'_, String> {
        self.last_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl InferenceEngine for OllamaEngine {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, request: EngineRequest) -> Result<ChunkStream, TandemError> {
        let body = self.chat_request(&request, true);
        let response = self.post("/api/chat", &body).await?;
        self.record().clear();

        let recorded = Arc::clone(&self.last_message);
        let lines = ndjson::decode::<ChatResponse, _, _>(Box::pin(response.bytes_stream()));
        let chunks = lines.filter_map(move |line| {
            let recorded = Arc::clone(&recorded);
            async move {
                match line {
                    Ok(ChatResponse {
                        error: Some(message),
                        ..
                    }) => Some(Err(TandemError::backend(message))),
                    Ok(line) => {
                        let delta = line.message.map(|m| m.content).unwrap_or_default();
                        if delta.is_empty() {
                            return None;
                        }
                        recorded
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push_str(&delta);
                        Some(Ok(EngineChunk { delta }))
                    }
                    Err(TandemError::StreamParse(detail)) => {
                        warn!(%detail, "skipping malformed chat line");
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            }
        });
        Ok(Box::pin(chunks))
    }

    async fn final_message(&self) -> Result<String, TandemError> {
        Ok(self.record().clone())
    }

    async fn complete(&self, request: EngineRequest) -> Result<String, TandemError> {
        let body = self.chat_request(&request, false);
        let response = self.post("/api/chat", &body).await?;
        let reply: ChatResponse = response.json().await.map_err(|e| TandemError::Backend {
            message: format!("failed to parse local engine reply: {e}"),
            source: Some(Box::new(e)),
        })?;
        if let Some(error) = reply.error {
            return Err(TandemError::backend(error));
        }
        Ok(reply.message.map(|m| m.content).unwrap_or_default())
    }
}

fn request_failed(e: reqwest::Error) -> TandemError {
    TandemError::Backend {
        message: format!("local engine request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// The name the daemon knows the model by.
///
/// A Hugging Face artifact URL becomes `hf.co/<owner>/<repo>`; any other
/// configuration falls back to `model`.
pub fn model_reference(config: &LocalConfig) -> String {
    let Some(raw) = config.model_url.as_deref() else {
        return config.model.clone();
    };

    let hf = url::Url::parse(raw).ok().and_then(|url| {
        let host = url.host_str()?.trim_start_matches("www.");
        if host != "huggingface.co" && host != "hf.co" {
            return None;
        }
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let repo = segments.next()?;
        Some(format!("hf.co/{owner}/{repo}"))
    });

    match hf {
        Some(reference) => reference,
        None => {
            warn!(model_url = %raw, "model_url is not a Hugging Face repository, using model");
            config.model.clone()
        }
    }
}

/// Whether to run in low-resource mode given the available memory in MiB.
pub fn resolve_low_resource(config: &LocalConfig, available_mb: f64) -> bool {
    match config.vram_required_mb {
        Some(required) if required > available_mb => {
            warn!(
                required_mb = required,
                available_mb, "not enough memory for the local model, enabling low-resource mode"
            );
            true
        }
        _ => config.low_resource,
    }
}

fn available_memory_mb() -> f64 {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    sys.available_memory() as f64 / (1024.0 * 1024.0)
}
