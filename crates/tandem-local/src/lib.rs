// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local backend for the Tandem chat router.
//!
//! [`LocalAdapter`] streams chat replies and answers schema-constrained
//! questions using an [`InferenceEngine`](tandem_core::InferenceEngine).
//! [`OllamaEngine`] is the shipped engine, a client for a local Ollama daemon.

pub mod adapter;
pub mod engine;
mod ndjson;
pub mod progress;
pub mod structured;
mod types;

pub use adapter::LocalAdapter;
pub use engine::OllamaEngine;
pub use progress::InitProgress;
