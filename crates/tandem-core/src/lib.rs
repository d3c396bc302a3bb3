// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tandem chat router.
//!
//! This crate provides the trait definitions, error taxonomy and common types
//! shared by the local and remote backends, the router, the privacy redaction
//! service and the chat orchestrator.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TandemError;
pub use types::{
    Backend, ChatTurn, EngineChunk, EngineRequest, HealthStatus, Message, MessageId,
    MessageSource, ResponseFormat, Role, RoutingDecision,
};

pub use traits::{ChatBackend, ChunkStream, InferenceEngine, PartialSink, PluginAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tandem_error_has_all_variants() {
        let _config = TandemError::Config("test".into());
        let _not_ready = TandemError::EngineNotReady;
        let _backend = TandemError::Backend {
            message: "test".into(),
            source: Some(Box::new(std::io::Error::other("test"))),
        };
        let _classification = TandemError::Classification("test".into());
        let _redaction = TandemError::Redaction("test".into());
        let _parse = TandemError::StreamParse("test".into());
        let _internal = TandemError::Internal("test".into());
    }

    #[test]
    fn message_source_round_trips_through_display() {
        use std::str::FromStr;

        let variants = [
            MessageSource::User,
            MessageSource::Local,
            MessageSource::Remote,
            MessageSource::Analyzing,
            MessageSource::Error,
        ];
        for variant in &variants {
            let parsed = MessageSource::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_chat_backend<T: ChatBackend>() {}
        fn _assert_inference_engine<T: InferenceEngine>() {}
    }
}
