// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the component graph from configuration.

use std::sync::Arc;

use tandem_agent::ChatOrchestrator;
use tandem_config::TandemConfig;
use tandem_core::TandemError;
use tandem_local::{InitProgress, LocalAdapter};
use tandem_openai::RemoteAdapter;
use tandem_privacy::RedactionService;
use tandem_router::ModelRouter;

/// Both adapters and the orchestrator that shares them.
///
/// The local adapter serves chat, classification and entity detection; it is
/// not ready until [`App::load_local`] (or an explicit install) completes.
pub struct App {
    pub config: TandemConfig,
    pub local: Arc<LocalAdapter>,
    pub remote: Arc<RemoteAdapter>,
    pub chat: ChatOrchestrator,
}

impl App {
    pub fn build(config: TandemConfig) -> Result<Self, TandemError> {
        let local = Arc::new(LocalAdapter::new(&config));
        let remote = Arc::new(RemoteAdapter::new(&config)?);
        Ok(Self::with_adapters(config, local, remote))
    }

    pub fn with_adapters(
        config: TandemConfig,
        local: Arc<LocalAdapter>,
        remote: Arc<RemoteAdapter>,
    ) -> Self {
        let router = ModelRouter::new(Arc::clone(&local), &config.routing);
        let redaction = RedactionService::new(Arc::clone(&local), &config.privacy);
        let chat = ChatOrchestrator::new(router, redaction, local.clone(), remote.clone());
        Self {
            config,
            local,
            remote,
            chat,
        }
    }

    /// Load the configured local model, reporting progress.
    pub async fn load_local<F>(&self, on_progress: F) -> Result<(), TandemError>
    where
        F: Fn(InitProgress) + Send + Sync,
    {
        self.local.initialize(&self.config.local, on_progress).await
    }
}
