// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tandem.
//!
//! Provides scripted stand-ins for the two seams the orchestrator depends on,
//! enabling fast, deterministic tests without a model daemon or network.
//!
//! # Components
//!
//! - [`MockEngine`] - scripted [`InferenceEngine`](tandem_core::InferenceEngine)
//! - [`MockBackend`] - scripted [`ChatBackend`](tandem_core::ChatBackend)

pub mod mock_backend;
pub mod mock_engine;

pub use mock_backend::MockBackend;
pub use mock_engine::MockEngine;

use tandem_core::TandemError;

/// One scripted reply, consumed by a single call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Streamed as the given pieces; non-streamed calls get them joined.
    Text(Vec<String>),
    /// The call fails.
    Fail(MockFailure),
}

impl MockReply {
    /// A reply streamed as a single chunk.
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(vec![text.into()])
    }

    /// A reply streamed as several chunks.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockReply::Text(chunks.into_iter().map(Into::into).collect())
    }

    /// A reply that fails with a backend error carrying `message`.
    pub fn backend_error(message: impl Into<String>) -> Self {
        MockReply::Fail(MockFailure::Backend(message.into()))
    }

    pub(crate) fn joined(&self) -> Result<String, TandemError> {
        match self {
            MockReply::Text(chunks) => Ok(chunks.concat()),
            MockReply::Fail(failure) => Err(failure.to_error()),
        }
    }
}

/// Error kinds a scripted reply can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    Backend(String),
    Config(String),
    EngineNotReady,
}

impl MockFailure {
    pub fn to_error(&self) -> TandemError {
        match self {
            MockFailure::Backend(message) => TandemError::backend(message.clone()),
            MockFailure::Config(message) => TandemError::Config(message.clone()),
            MockFailure::EngineNotReady => TandemError::EngineNotReady,
        }
    }
}

const DEFAULT_REPLY: &str = "mock response";
