// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Backends extend [`PluginAdapter`] and use `#[async_trait]` for dynamic
//! dispatch; the orchestrator depends only on [`ChatBackend`].

pub mod adapter;
pub mod backend;
pub mod engine;

pub use adapter::PluginAdapter;
pub use backend::{ChatBackend, PartialSink};
pub use engine::{ChunkStream, InferenceEngine};
