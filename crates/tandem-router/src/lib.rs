// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend selection for Tandem.
//!
//! - [`BackendTags`]: explicit `@remote` / `@local` overrides in user input
//! - [`ComplexityClassifier`]: LLM-scored prompt complexity via the local model
//! - [`ModelRouter`]: combines both with the word-count override into a [`Route`]

pub mod classifier;
pub mod router;
pub mod tags;

pub use classifier::{Classification, ComplexityClassifier};
pub use router::{ModelRouter, Route, RouteChoice};
pub use tags::{BackendTags, word_count};
