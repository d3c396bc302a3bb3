// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the adapters, the router, the redaction service and
//! the orchestrator.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        MessageId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who produced a message, or what state an assistant placeholder is in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum MessageSource {
    User,
    Local,
    Remote,
    /// Assistant placeholder whose backend has not been chosen yet.
    Analyzing,
    Error,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub is_user: bool,
    pub source: MessageSource,
}

impl Message {
    /// A user-authored message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            is_user: true,
            source: MessageSource::User,
        }
    }

    /// An empty assistant placeholder awaiting routing.
    pub fn placeholder() -> Self {
        Self {
            id: MessageId::new(),
            text: String::new(),
            is_user: false,
            source: MessageSource::Analyzing,
        }
    }

    /// Converts this message into a role-tagged turn for a backend.
    pub fn to_turn(&self) -> ChatTurn {
        let role = if self.is_user {
            Role::User
        } else {
            Role::Assistant
        };
        ChatTurn {
            role,
            content: self.text.clone(),
        }
    }
}

/// Role of a turn in a backend chat request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged chat turn as sent to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The two language-model backends a turn can be routed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// The resource-constrained model running on this machine.
    Local,
    /// The remote API-backed model.
    Remote,
}

impl Backend {
    /// The message source an assistant placeholder takes once this backend is chosen.
    pub fn message_source(self) -> MessageSource {
        match self {
            Backend::Local => MessageSource::Local,
            Backend::Remote => MessageSource::Remote,
        }
    }
}

/// Routing outcome for a single user turn. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub use_remote: bool,
    pub reason: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

// --- Local engine request types ---

/// Asks the engine to emit JSON matching a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFormat {
    /// JSON schema serialized as a string.
    pub schema: String,
}

/// A request to the local inference engine.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: Option<ResponseFormat>,
}

/// One incremental piece of a streamed engine reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineChunk {
    pub delta: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn user_and_placeholder_constructors() {
        let user = Message::user("hello");
        assert!(user.is_user);
        assert_eq!(user.source, MessageSource::User);

        let pending = Message::placeholder();
        assert!(!pending.is_user);
        assert!(pending.text.is_empty());
        assert_eq!(pending.source, MessageSource::Analyzing);
    }

    #[test]
    fn to_turn_maps_authorship_to_role() {
        assert_eq!(Message::user("q").to_turn(), ChatTurn::user("q"));

        let mut reply = Message::placeholder();
        reply.text = "a".into();
        reply.source = MessageSource::Local;
        assert_eq!(reply.to_turn(), ChatTurn::assistant("a"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatTurn::system("be brief")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
    }

    #[test]
    fn backend_display_and_source() {
        assert_eq!(Backend::Local.to_string(), "local");
        assert_eq!(Backend::Remote.to_string(), "remote");
        assert_eq!(Backend::Remote.message_source(), MessageSource::Remote);
        assert_eq!(Backend::Local.message_source(), MessageSource::Local);
    }
}
