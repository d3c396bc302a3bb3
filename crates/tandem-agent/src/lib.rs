// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat orchestration for Tandem.
//!
//! The [`ChatOrchestrator`] is the central coordinator that:
//! - Records each user message with an assistant placeholder
//! - Routes the turn to the local or remote backend
//! - Redacts names before remote calls and restores them in replies
//! - Folds streamed partial text into the placeholder
//! - Publishes a [`ChatSnapshot`] on every change

pub mod conversation;
pub mod orchestrator;

pub use conversation::ChatSnapshot;
pub use orchestrator::{ChatOrchestrator, TurnHandle};
