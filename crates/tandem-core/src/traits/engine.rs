// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait for the locally-executed inference engine wrapped by the local adapter.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::TandemError;
use crate::types::{EngineChunk, EngineRequest};

/// Boxed stream of reply chunks from an engine.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<EngineChunk, TandemError>> + Send>>;

/// A loaded, ready-to-serve local model.
///
/// Requests are independent and non-overlapping from the caller's point of view.
#[async_trait]
pub trait InferenceEngine: Send + Sync + 'static {
    /// Identifier of the loaded model.
    fn model_id(&self) -> &str;

    /// Starts a streamed chat completion.
    async fn stream_chat(&self, request: EngineRequest) -> Result<ChunkStream, TandemError>;

    /// The engine's authoritative text for the most recent streamed reply.
    ///
    /// A stream started later replaces it, so callers keep one stream in
    /// flight until they have read this.
    async fn final_message(&self) -> Result<String, TandemError>;

    /// Runs a non-streamed completion, honoring `response_format` when set.
    async fn complete(&self, request: EngineRequest) -> Result<String, TandemError>;
}
