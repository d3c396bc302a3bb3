// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reversible pseudonymization of person and organization names.
//!
//! Outgoing user text is scanned by the local model, each located name is
//! replaced by a session-stable token (`PERSON_n`, `ORG_n`), and incoming text
//! is mapped back before anyone sees it. Every operation degrades to passing
//! text through unchanged; nothing here fails a turn.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use tandem_config::model::PrivacyConfig;
use tandem_core::TandemError;
use tandem_core::types::{ChatTurn, Role};
use tandem_local::LocalAdapter;

use crate::detect::detect_entities;
use crate::entity::PiiEntity;
use crate::session::{MacroMap, MacroSession};

/// Result of redacting one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionResult {
    pub redacted_text: String,
    pub entities: Vec<PiiEntity>,
    /// Tokens issued or reused for this text only.
    pub macro_map: MacroMap,
}

impl RedactionResult {
    fn unchanged(text: &str) -> Self {
        Self {
            redacted_text: text.to_string(),
            ..Self::default()
        }
    }
}

/// An outgoing message and its history, ready for the remote backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactedExchange {
    pub message: String,
    pub history: Vec<ChatTurn>,
    pub macro_map: MacroMap,
    /// True when at least one text went out unredacted because detection failed.
    pub degraded: bool,
}

/// Detects, substitutes and restores names for one chat session.
pub struct RedactionService {
    local: Arc<LocalAdapter>,
    session: Mutex<MacroSession>,
    enabled: bool,
    detection_max_tokens: u32,
}

impl RedactionService {
    pub fn new(local: Arc<LocalAdapter>, config: &PrivacyConfig) -> Self {
        Self {
            local,
            session: Mutex::new(MacroSession::new()),
            enabled: config.enabled,
            detection_max_tokens: config.detection_max_tokens,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn session(&self) -> MutexGuard<'_, MacroSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Redact one text, passing it through unchanged if detection fails.
    pub async fn redact_text(&self, text: &str) -> RedactionResult {
        match self.try_redact_text(text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "redaction failed, sending text unredacted");
                RedactionResult::unchanged(text)
            }
        }
    }

    async fn try_redact_text(&self, text: &str) -> Result<RedactionResult, TandemError> {
        let entities = detect_entities(&self.local, text, self.detection_max_tokens).await?;
        if entities.is_empty() {
            return Ok(RedactionResult::unchanged(text));
        }

        let mut ordered: Vec<&PiiEntity> = entities.iter().collect();
        ordered.sort_by(|a, b| b.start.cmp(&a.start));

        let mut redacted = text.to_string();
        let mut macro_map = MacroMap::new();
        {
            let mut session = self.session();
            for entity in ordered {
                let token = session.assign(&entity.name, entity.kind);
                splice(&mut redacted, entity, &token);
                macro_map.insert(token, entity.name.clone());
            }
        }

        debug!(
            entities = entities.len(),
            tokens = ?macro_map.keys().collect::<Vec<_>>(),
            "text redacted"
        );
        Ok(RedactionResult {
            redacted_text: redacted,
            entities,
            macro_map,
        })
    }

    /// Redact user turns only; assistant and system turns pass through untouched.
    pub async fn redact_messages(&self, history: &[ChatTurn]) -> (Vec<ChatTurn>, MacroMap) {
        let (turns, map, _) = self.redact_history(history).await;
        (turns, map)
    }

    async fn redact_history(&self, history: &[ChatTurn]) -> (Vec<ChatTurn>, MacroMap, bool) {
        let mut turns = Vec::with_capacity(history.len());
        let mut combined = MacroMap::new();
        let mut degraded = false;

        for turn in history {
            if turn.role != Role::User {
                turns.push(turn.clone());
                continue;
            }
            let result = match self.try_redact_text(&turn.content).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "history turn sent unredacted");
                    degraded = true;
                    RedactionResult::unchanged(&turn.content)
                }
            };
            combined.extend(result.macro_map);
            turns.push(ChatTurn {
                role: turn.role,
                content: result.redacted_text,
            });
        }
        (turns, combined, degraded)
    }

    /// Redact a new message and the history that accompanies it.
    ///
    /// With redaction disabled everything passes through and no detection
    /// calls are made.
    pub async fn redact_exchange(&self, message: &str, history: &[ChatTurn]) -> RedactedExchange {
        if !self.enabled {
            return RedactedExchange {
                message: message.to_string(),
                history: history.to_vec(),
                ..RedactedExchange::default()
            };
        }

        let (redacted_message, message_map, mut degraded) =
            match self.try_redact_text(message).await {
                Ok(result) => (result.redacted_text, result.macro_map, false),
                Err(e) => {
                    warn!(error = %e, "message sent unredacted");
                    (message.to_string(), MacroMap::new(), true)
                }
            };

        let (history, mut macro_map, history_degraded) = self.redact_history(history).await;
        degraded |= history_degraded;
        macro_map.extend(message_map);

        RedactedExchange {
            message: redacted_message,
            history,
            macro_map,
            degraded,
        }
    }

    /// Replace every known token in `text` with its original name.
    ///
    /// Uses `map` when given, otherwise the live session map. Longer tokens are
    /// replaced first so `PERSON_1` never clobbers `PERSON_12`. Safe on partial
    /// streamed text.
    pub fn restore_text(&self, text: &str, map: Option<&MacroMap>) -> String {
        match map {
            Some(map) => restore_with(text, map),
            None => restore_with(text, self.session().forward()),
        }
    }

    /// Restore streamed text that may still be growing.
    ///
    /// A trailing fragment that could still become a longer token
    /// (`PERSON_`, or `PERSON_1` while `PERSON_12` is known) is held back,
    /// so successive results only ever grow.
    pub fn restore_partial(&self, text: &str, map: Option<&MacroMap>) -> String {
        match map {
            Some(map) => restore_with(&text[..settled_len(text, map)], map),
            None => {
                let session = self.session();
                let map = session.forward();
                restore_with(&text[..settled_len(text, map)], map)
            }
        }
    }

    /// Forget every pseudonym and restart numbering.
    pub fn clear_session(&self) {
        self.session().clear();
        debug!("privacy session cleared");
    }

    /// A copy of the live session map.
    pub fn session_macro_map(&self) -> MacroMap {
        self.session().forward().clone()
    }
}

/// Replace `entity`'s span in `text` with `token`.
///
/// Spans come from the unredacted text and are applied right to left, so a
/// name that repeats resolves every copy to the same first-occurrence span and
/// later splices land on already-rewritten text. A span that no longer fits the
/// text is skipped.
fn splice(text: &mut String, entity: &PiiEntity, token: &str) {
    let (start, end) = (entity.start, entity.end);
    if start > end || end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
        warn!(token, start, end, "entity span no longer fits redacted text, skipping");
        return;
    }
    text.replace_range(start..end, token);
}

fn restore_with(text: &str, map: &MacroMap) -> String {
    let mut tokens: Vec<(&String, &String)> = map.iter().collect();
    tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
    tokens
        .into_iter()
        .fold(text.to_string(), |acc, (token, name)| acc.replace(token.as_str(), name))
}

/// Length of `text` minus any trailing fragment that is a strict prefix of a token.
fn settled_len(text: &str, map: &MacroMap) -> usize {
    let longest = map.keys().map(String::len).max().unwrap_or(0);
    let window = text.len().saturating_sub(longest);
    text.char_indices()
        .map(|(i, _)| i)
        .filter(|&i| i >= window)
        .find(|&i| {
            let tail = &text[i..];
            map.keys().any(|token| token.len() > tail.len() && token.starts_with(tail))
        })
        .unwrap_or(text.len())
}
