// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tandem chat router.
//!
//! Only [`TandemError::Config`], [`TandemError::EngineNotReady`] and
//! [`TandemError::Backend`] ever reach a user-visible message. The remaining
//! variants are absorbed by their owning component with a deterministic fallback.

use thiserror::Error;

/// The primary error type used across all Tandem adapters and services.
#[derive(Debug, Error)]
pub enum TandemError {
    /// Missing or invalid configuration (e.g. no remote API key). Fatal to the turn.
    #[error("configuration error: {0}")]
    Config(String),

    /// The local engine was invoked before initialization completed.
    #[error("local engine is not ready yet")]
    EngineNotReady,

    /// Network failure or non-success response from either backend.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The complexity classifier could not produce a usable score.
    #[error("classification error: {0}")]
    Classification(String),

    /// PII detection or substitution failed.
    #[error("redaction error: {0}")]
    Redaction(String),

    /// A streamed frame or a structured reply could not be parsed.
    #[error("stream parse error: {0}")]
    StreamParse(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TandemError {
    /// Shorthand for a [`TandemError::Backend`] without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        TandemError::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error kind may be shown to the user as a turn failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            TandemError::Config(_) | TandemError::EngineNotReady | TandemError::Backend { .. }
        )
    }

    /// Human-readable text written into a failed assistant placeholder.
    pub fn user_message(&self) -> String {
        match self {
            TandemError::Config(msg) => msg.clone(),
            TandemError::EngineNotReady => {
                "The local model is still loading. Please try again in a moment.".to_string()
            }
            TandemError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
