// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single streaming contract both backends expose to the orchestrator.

use async_trait::async_trait;

use crate::error::TandemError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChatTurn;

/// Receives the full text produced so far, never a bare delta.
pub type PartialSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// A chat backend that streams its reply through an incremental callback.
///
/// `history` is the ordered conversation ending with the new user turn. The
/// adapter prepends its own system preamble. Every `on_partial` call carries
/// the accumulated reply text; the returned string is the final reply.
#[async_trait]
pub trait ChatBackend: PluginAdapter {
    async fn complete(
        &self,
        history: &[ChatTurn],
        on_partial: PartialSink<'_>,
    ) -> Result<String, TandemError>;
}
