// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat orchestrator: one task per user turn over a shared conversation.
//!
//! A turn moves its placeholder through `Analyzing -> Local|Remote -> (text
//! grows) -> done`, or to `Error` on a user-facing failure. Routing is resolved
//! once, before any backend call. Only the remote path is redacted; partial
//! remote text is restored before it becomes visible.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tandem_core::traits::ChatBackend;
use tandem_core::types::{Backend, ChatTurn, Message, MessageId};
use tandem_privacy::{MacroMap, RedactionService};
use tandem_router::ModelRouter;

use crate::conversation::{ChatSnapshot, Conversation, TurnIds};

/// A turn that has been accepted and is running in the background.
#[derive(Debug)]
pub struct TurnHandle {
    pub user_id: MessageId,
    pub reply_id: MessageId,
    task: JoinHandle<()>,
}

impl TurnHandle {
    /// Wait for the turn to finish. The outcome is in the conversation.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, reply_id = %self.reply_id, "turn task aborted");
        }
    }
}

struct Inner {
    conversation: Mutex<Conversation>,
    snapshots: watch::Sender<ChatSnapshot>,
    router: ModelRouter,
    redaction: RedactionService,
    local: Arc<dyn ChatBackend>,
    remote: Arc<dyn ChatBackend>,
}

/// Owns the conversation and drives each turn through routing, optional
/// redaction and a streamed backend call.
///
/// Cloning is cheap and every clone shares the same conversation.
#[derive(Clone)]
pub struct ChatOrchestrator {
    inner: Arc<Inner>,
}

impl ChatOrchestrator {
    pub fn new(
        router: ModelRouter,
        redaction: RedactionService,
        local: Arc<dyn ChatBackend>,
        remote: Arc<dyn ChatBackend>,
    ) -> Self {
        let (snapshots, _) = watch::channel(ChatSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                conversation: Mutex::new(Conversation::default()),
                snapshots,
                router,
                redaction,
                local,
                remote,
            }),
        }
    }

    /// Accept a user message and start its turn.
    ///
    /// Input that is empty after trimming is ignored and yields `None`. The
    /// user message and an `Analyzing` placeholder are visible before this
    /// returns. Must be called within a Tokio runtime.
    pub fn send_message(&self, raw: &str) -> Option<TurnHandle> {
        if raw.trim().is_empty() {
            return None;
        }

        let (ids, history) = self.inner.update(|conv| conv.begin_turn(raw));
        debug!(reply_id = %ids.reply, history = history.len(), "turn accepted");

        let inner = Arc::clone(&self.inner);
        let raw = raw.to_string();
        let reply = ids.reply.clone();
        let task = tokio::spawn(async move {
            inner.run_turn(&raw, &reply, history).await;
            inner.update(|conv| conv.finish(&reply));
        });

        let TurnIds { user, reply } = ids;
        Some(TurnHandle {
            user_id: user,
            reply_id: reply,
            task,
        })
    }

    /// Current messages.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().snapshot().messages
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().is_loading()
    }

    /// Observe every change to the conversation.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Start a new privacy session; pseudonym numbering restarts.
    pub fn clear_session(&self) {
        self.inner.redaction.clear_session();
    }

    /// Start over: new privacy session and an empty conversation.
    ///
    /// Turns already running finish without writing into the new conversation.
    pub fn reset(&self) {
        self.clear_session();
        self.inner.update(Conversation::clear);
        info!("conversation reset");
    }

    /// The live pseudonym map of the privacy session.
    pub fn session_macro_map(&self) -> MacroMap {
        self.inner.redaction.session_macro_map()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Conversation> {
        self.conversation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` and publish the resulting snapshot while still holding the lock,
    /// so observers see changes in order.
    fn update<R>(&self, f: impl FnOnce(&mut Conversation) -> R) -> R {
        let mut conv = self.lock();
        let out = f(&mut conv);
        self.snapshots.send_replace(conv.snapshot());
        out
    }

    fn backend(&self, backend: Backend) -> &Arc<dyn ChatBackend> {
        match backend {
            Backend::Local => &self.local,
            Backend::Remote => &self.remote,
        }
    }

    async fn run_turn(&self, raw: &str, reply: &MessageId, history: Vec<ChatTurn>) {
        let route = match self.router.route(raw).await {
            Ok(route) => route,
            Err(e) => {
                warn!(error = %e, "routing failed");
                self.update(|conv| conv.fail(reply, e.user_message()));
                return;
            }
        };

        let backend = route.choice.backend();
        info!(%backend, reason = %route.choice.reason(), "turn routed");
        self.update(|conv| conv.set_source(reply, backend.message_source()));

        let (outbound, macro_map) = match backend {
            Backend::Local => {
                let mut turns = history;
                turns.push(ChatTurn::user(route.text));
                (turns, None)
            }
            Backend::Remote => {
                let exchange = self.redaction.redact_exchange(&route.text, &history).await;
                if exchange.degraded {
                    warn!("remote request carries unredacted text");
                }
                let mut turns = exchange.history;
                turns.push(ChatTurn::user(exchange.message));
                (turns, Some(exchange.macro_map))
            }
        };

        let mut on_partial = |partial: &str| {
            let visible = match &macro_map {
                Some(map) => self.redaction.restore_partial(partial, Some(map)),
                None => partial.to_string(),
            };
            self.update(|conv| conv.set_text(reply, &visible));
        };

        let result = self
            .backend(backend)
            .complete(&outbound, &mut on_partial)
            .await;

        match result {
            Ok(final_text) => {
                let visible = match &macro_map {
                    Some(map) => self.redaction.restore_text(&final_text, Some(map)),
                    None => final_text,
                };
                debug!(%backend, len = visible.len(), "turn complete");
                self.update(|conv| conv.set_text(reply, &visible));
            }
            Err(e) => {
                warn!(%backend, error = %e, "backend call failed");
                self.update(|conv| conv.fail(reply, e.user_message()));
            }
        }
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("local", &self.inner.local.name())
            .field("remote", &self.inner.remote.name())
            .finish_non_exhaustive()
    }
}

