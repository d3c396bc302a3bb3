// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use tandem_core::traits::{ChatBackend, PartialSink, PluginAdapter};
use tandem_core::types::{Backend, ChatTurn, HealthStatus};
use tandem_core::TandemError;

use crate::{DEFAULT_REPLY, MockReply};

type Observer = Box<dyn Fn() + Send + Sync>;

/// A [`ChatBackend`] that streams scripted replies through `on_partial`.
///
/// Each call records the history it was given. A gated backend parks every
/// call until [`MockBackend::release`] is called, which lets tests overlap turns.
pub struct MockBackend {
    backend: Backend,
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<Vec<ChatTurn>>>,
    gate: Option<Arc<Notify>>,
    observer: Option<Observer>,
}

impl MockBackend {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
            observer: None,
        }
    }

    /// Create a backend pre-loaded with the given replies.
    pub fn with_replies(backend: Backend, replies: impl IntoIterator<Item = MockReply>) -> Self {
        let mock = Self::new(backend);
        mock.lock_replies().extend(replies);
        mock
    }

    /// Park every call until released.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Run `observer` right after every `on_partial` call.
    pub fn after_each_partial<F>(mut self, observer: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Let one parked (or the next) call proceed.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.lock_replies().push_back(reply);
    }

    /// Histories received so far, one per call.
    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls that have started.
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        match self.backend {
            Backend::Local => "mock-local",
            Backend::Remote => "mock-remote",
        }
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TandemError> {
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete(
        &self,
        history: &[ChatTurn],
        on_partial: PartialSink<'_>,
    ) -> Result<String, TandemError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(history.to_vec());

        let reply = self
            .lock_replies()
            .pop_front()
            .unwrap_or_else(|| MockReply::text(DEFAULT_REPLY));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match reply {
            MockReply::Text(chunks) => {
                let mut buffer = String::new();
                for chunk in chunks {
                    buffer.push_str(&chunk);
                    on_partial(&buffer);
                    if let Some(observer) = &self.observer {
                        observer();
                    }
                }
                Ok(buffer)
            }
            MockReply::Fail(failure) => Err(failure.to_error()),
        }
    }
}
