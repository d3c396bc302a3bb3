// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory message log shared by concurrent turns.
//!
//! Messages are only ever appended or updated by id, never by index, so one
//! turn cannot touch another turn's placeholder.

use std::collections::HashSet;

use tandem_core::types::{ChatTurn, Message, MessageId, MessageSource};

/// What observers see after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    /// True while at least one turn is in flight.
    pub is_loading: bool,
}

/// Ids created for one accepted user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TurnIds {
    pub user: MessageId,
    pub reply: MessageId,
}

#[derive(Debug, Default)]
pub(crate) struct Conversation {
    messages: Vec<Message>,
    /// Placeholders whose turn is still running.
    pending: HashSet<MessageId>,
}

impl Conversation {
    /// Append the user message and its placeholder.
    ///
    /// Returns the new ids and the history a backend should see: everything
    /// before the user message except `Analyzing` messages and placeholders of
    /// turns still running.
    pub fn begin_turn(&mut self, text: &str) -> (TurnIds, Vec<ChatTurn>) {
        let history = self
            .messages
            .iter()
            .filter(|m| m.source != MessageSource::Analyzing && !self.pending.contains(&m.id))
            .map(Message::to_turn)
            .collect();

        let user = Message::user(text);
        let reply = Message::placeholder();
        let ids = TurnIds {
            user: user.id.clone(),
            reply: reply.id.clone(),
        };
        self.pending.insert(reply.id.clone());
        self.messages.push(user);
        self.messages.push(reply);
        (ids, history)
    }

    fn find_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }

    /// Returns false when the message is gone, e.g. after a reset.
    pub fn set_source(&mut self, id: &MessageId, source: MessageSource) -> bool {
        self.find_mut(id).map(|m| m.source = source).is_some()
    }

    pub fn set_text(&mut self, id: &MessageId, text: &str) -> bool {
        match self.find_mut(id) {
            Some(m) => {
                if m.text != text {
                    m.text.clear();
                    m.text.push_str(text);
                }
                true
            }
            None => false,
        }
    }

    /// Replace the placeholder with an error.
    pub fn fail(&mut self, id: &MessageId, error_text: String) -> bool {
        match self.find_mut(id) {
            Some(m) => {
                m.text = error_text;
                m.source = MessageSource::Error;
                true
            }
            None => false,
        }
    }

    pub fn finish(&mut self, id: &MessageId) {
        self.pending.remove(id);
    }

    /// Drop every message. Running turns keep their pending entry so loading
    /// state stays accurate; their later updates find nothing to change.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.messages.clone(),
            is_loading: !self.pending.is_empty(),
        }
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }
}
