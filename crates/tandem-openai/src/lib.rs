// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote backend for the Tandem chat router.
//!
//! [`RemoteAdapter`] implements [`ChatBackend`] against an OpenAI-compatible
//! chat completions endpoint, streaming the reply over Server-Sent Events.
//! API key resolution order: `remote.api_key` -> `OPENAI_API_KEY` -> error,
//! checked on every call so a missing key fails only that turn.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use tracing::{debug, info};

use tandem_config::TandemConfig;
use tandem_core::TandemError;
use tandem_core::traits::{ChatBackend, PartialSink, PluginAdapter};
use tandem_core::types::{Backend, ChatTurn, HealthStatus};

use crate::client::OpenAiClient;

/// Remote chat backend.
pub struct RemoteAdapter {
    client: OpenAiClient,
    system_prompt: String,
}

impl RemoteAdapter {
    pub fn new(config: &TandemConfig) -> Result<Self, TandemError> {
        let client = OpenAiClient::new(&config.remote)?;
        info!(model = client.model(), url = %config.remote.api_url, "remote adapter initialized");
        Ok(Self::with_client(client, config.agent.system_prompt.clone()))
    }

    pub fn with_client(client: OpenAiClient, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
        }
    }
}

#[async_trait]
impl PluginAdapter for RemoteAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn backend(&self) -> Backend {
        Backend::Remote
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        if self.client.has_api_key() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "no API key; set remote.api_key or {}",
                client::API_KEY_ENV
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), TandemError> {
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for RemoteAdapter {
    async fn complete(
        &self,
        history: &[ChatTurn],
        on_partial: PartialSink<'_>,
    ) -> Result<String, TandemError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatTurn::system(self.system_prompt.clone()));
        messages.extend_from_slice(history);

        debug!(turns = messages.len(), "sending remote chat request");
        let frames = self.client.stream_chat(&messages).await?;
        sse::accumulate(frames, on_partial).await
    }
}
