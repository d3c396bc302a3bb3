// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama wire types.

use serde::{Deserialize, Serialize};
use tandem_core::types::ChatTurn;

/// Body of `POST /api/chat`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatTurn],
    pub stream: bool,
    /// JSON schema (or the string `"json"`) constraining the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
    pub options: ChatOptions,
}

/// Model options sent with every chat request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatOptions {
    pub temperature: f32,
    pub num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub low_vram: bool,
}

/// One NDJSON line of a streamed chat, or the whole non-streamed reply.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

/// Body of `POST /api/pull`.
#[derive(Debug, Serialize)]
pub(crate) struct PullRequest<'a> {
    pub model: &'a str,
    pub stream: bool,
}

/// One NDJSON line of a model pull.
#[derive(Debug, Deserialize)]
pub(crate) struct PullProgressLine {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PullProgressLine {
    pub fn fraction(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => Some(done as f64 / total as f64),
            _ if self.status == "success" => Some(1.0),
            _ => None,
        }
    }
}

/// Body of `POST /api/show`.
#[derive(Debug, Serialize)]
pub(crate) struct ShowRequest<'a> {
    pub model: &'a str,
}

/// Error body returned by the daemon on non-success status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
