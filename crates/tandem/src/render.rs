// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns conversation snapshots into incremental terminal output.
//!
//! While a reply streams only whole words are released, so a pseudonym that
//! is still arriving (`PERSON_`) is never printed before it is restored.

use tandem_agent::ChatSnapshot;
use tandem_core::types::{Message, MessageId, MessageSource};

/// One thing to write to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// The reply was routed; emitted once.
    Routed(MessageSource),
    Text(String),
    /// The turn failed with this message.
    Failed(String),
}

/// Tracks how much of one reply has been printed.
#[derive(Debug)]
pub struct ReplyPrinter {
    reply_id: MessageId,
    printed: String,
    routed: bool,
    failed: bool,
}

impl ReplyPrinter {
    pub fn new(reply_id: MessageId) -> Self {
        Self {
            reply_id,
            printed: String::new(),
            routed: false,
            failed: false,
        }
    }

    /// Pieces not yet printed for `snapshot`. Pass `done` once the turn has
    /// finished to flush the trailing partial word.
    pub fn update(&mut self, snapshot: &ChatSnapshot, done: bool) -> Vec<Piece> {
        let Some(reply) = snapshot.messages.iter().find(|m| m.id == self.reply_id) else {
            return Vec::new();
        };
        self.pieces_for(reply, done)
    }

    fn pieces_for(&mut self, reply: &Message, done: bool) -> Vec<Piece> {
        let mut pieces = Vec::new();
        if self.failed {
            return pieces;
        }

        match reply.source {
            MessageSource::Analyzing | MessageSource::User => return pieces,
            MessageSource::Error => {
                self.failed = true;
                pieces.push(Piece::Failed(reply.text.clone()));
                return pieces;
            }
            source @ (MessageSource::Local | MessageSource::Remote) => {
                if !self.routed {
                    self.routed = true;
                    pieces.push(Piece::Routed(source));
                }
            }
        }

        let releasable = if done {
            reply.text.as_str()
        } else {
            match reply.text.rfind(char::is_whitespace) {
                Some(i) => &reply.text[..i],
                None => "",
            }
        };

        if let Some(rest) = releasable.strip_prefix(self.printed.as_str()) {
            if !rest.is_empty() {
                pieces.push(Piece::Text(rest.to_string()));
            }
        } else {
            pieces.push(Piece::Text(format!("\n{releasable}")));
        }
        self.printed = releasable.to_string();
        pieces
    }
}
