// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible chat completions endpoint.
//!
//! Provides [`OpenAiClient`], which handles request construction, bearer
//! authentication, streaming SSE responses and transient error retry.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use tandem_config::model::RemoteConfig;
use tandem_core::TandemError;
use tandem_core::types::ChatTurn;

use crate::sse::{self, FrameStream};
use crate::types::{ApiErrorResponse, ChatCompletionRequest};

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// HTTP client for chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, TandemError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| TandemError::Backend {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the pause between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a key is available from config or the environment.
    pub fn has_api_key(&self) -> bool {
        resolve_api_key(self.api_key.as_deref(), |name| std::env::var(name).ok()).is_ok()
    }

    /// Sends a streaming request and returns the decoded frame stream.
    ///
    /// A transient status (429, 500, 502, 503) is retried up to `max_retries`
    /// times. Retries only happen before any frame is returned.
    pub async fn stream_chat(&self, messages: &[ChatTurn]) -> Result<FrameStream, TandemError> {
        let api_key = resolve_api_key(self.api_key.as_deref(), |name| std::env::var(name).ok())?;
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                warn!(attempt, "retrying chat completion after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| TandemError::Backend {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(%status, attempt, "chat completion response received");

            if status.is_success() {
                return Ok(sse::parse_sse_stream(response.bytes_stream()));
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(%status, "transient error, will retry");
                attempt += 1;
                continue;
            }

            return Err(TandemError::backend(error_message(status, &body)));
        }
    }
}

/// Key from config when non-empty, else from `OPENAI_API_KEY`.
pub(crate) fn resolve_api_key(
    configured: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, TandemError> {
    if let Some(key) = configured.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    env(API_KEY_ENV).filter(|k| !k.is_empty()).ok_or_else(|| {
        TandemError::Config(format!(
            "OpenAI API key not found. Set remote.api_key in config or the {API_KEY_ENV} environment variable."
        ))
    })
}

/// The server's `error.message` when present, else a generic message.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Failed to generate AI response (HTTP {})", status.as_u16()))
}

fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
