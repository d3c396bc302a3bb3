// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted inference engine.
//!
//! Replies come from a responder closure when one is set, otherwise from a
//! FIFO queue, otherwise a default "mock response". Every request is recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::{StreamExt, stream};

use tandem_core::traits::{ChunkStream, InferenceEngine};
use tandem_core::types::{EngineChunk, EngineRequest};
use tandem_core::TandemError;

use crate::{DEFAULT_REPLY, MockReply};

type Responder = Box<dyn Fn(&EngineRequest) -> MockReply + Send + Sync>;

/// An [`InferenceEngine`] that replays scripted replies.
pub struct MockEngine {
    model_id: String,
    replies: Mutex<VecDeque<MockReply>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<EngineRequest>>,
    last_message: Arc<Mutex<String>>,
    final_override: Mutex<Option<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            model_id: "mock-engine".to_string(),
            replies: Mutex::new(VecDeque::new()),
            responder: None,
            requests: Mutex::new(Vec::new()),
            last_message: Arc::new(Mutex::new(String::new())),
            final_override: Mutex::new(None),
        }
    }

    /// Create an engine pre-loaded with the given replies.
    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let engine = Self::new();
        engine.lock_replies().extend(replies);
        engine
    }

    /// Create an engine that computes each reply from the request.
    ///
    /// Useful when call order is not fixed, e.g. a classification and a
    /// detection call in the same turn.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&EngineRequest) -> MockReply + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Add a reply to the end of the queue.
    pub fn push_reply(&self, reply: MockReply) {
        self.lock_replies().push_back(reply);
    }

    /// Make `final_message` return `text` instead of the streamed concatenation.
    pub fn set_final_message(&self, text: impl Into<String>) {
        *self
            .final_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(text.into());
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_reply(&self, request: &EngineRequest) -> MockReply {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(responder) = &self.responder {
            return responder(request);
        }
        self.lock_replies()
            .pop_front()
            .unwrap_or_else(|| MockReply::text(DEFAULT_REPLY))
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn stream_chat(&self, request: EngineRequest) -> Result<ChunkStream, TandemError> {
        let chunks = match self.next_reply(&request) {
            MockReply::Text(chunks) => chunks,
            MockReply::Fail(failure) => return Err(failure.to_error()),
        };

        *self
            .last_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = chunks.concat();

        let items: Vec<Result<EngineChunk, TandemError>> = chunks
            .into_iter()
            .map(|delta| Ok(EngineChunk { delta }))
            .collect();
        // Yield between chunks so concurrent streams interleave.
        Ok(Box::pin(stream::iter(items).then(|item| async move {
            tokio::task::yield_now().await;
            item
        })))
    }

    async fn final_message(&self) -> Result<String, TandemError> {
        if let Some(text) = self
            .final_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Ok(text);
        }
        Ok(self
            .last_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn complete(&self, request: EngineRequest) -> Result<String, TandemError> {
        self.next_reply(&request).joined()
    }
}
