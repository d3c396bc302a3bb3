// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn-level behavior of the chat orchestrator against scripted backends.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tokio::sync::watch;

use tandem_agent::{ChatOrchestrator, ChatSnapshot};
use tandem_config::model::{PrivacyConfig, RoutingConfig};
use tandem_core::types::{Backend, ChatTurn, MessageSource};
use tandem_local::LocalAdapter;
use tandem_privacy::RedactionService;
use tandem_router::ModelRouter;
use tandem_test_utils::{MockBackend, MockEngine, MockFailure, MockReply};

/// Answers classification with `score` and detection with whichever of
/// `names` occur in the text.
fn scripted_engine(score: u8, names: &'static [(&'static str, &'static str)]) -> MockEngine {
    MockEngine::with_responder(move |req| {
        let system = &req.messages[0].content;
        let prompt = &req.messages[1].content;
        if system.contains("privacy filter") {
            let found: Vec<String> = names
                .iter()
                .filter(|(name, _)| prompt.contains(name))
                .map(|(name, kind)| format!(r#"{{"name": "{name}", "type": "{kind}"}}"#))
                .collect();
            MockReply::text(format!(r#"{{"entities": [{}]}}"#, found.join(", ")))
        } else {
            MockReply::text(format!(
                r#"{{"score": {score}, "explanation": "scored {score}"}}"#
            ))
        }
    })
}

struct Fixture {
    chat: ChatOrchestrator,
    engine: Arc<MockEngine>,
    local: Arc<MockBackend>,
    remote: Arc<MockBackend>,
}

fn fixture(engine: Option<MockEngine>, local: MockBackend, remote: MockBackend) -> Fixture {
    let adapter = Arc::new(LocalAdapter::with_settings("sys", 0.7, 1000));
    let engine = engine.map(Arc::new);
    if let Some(engine) = &engine {
        adapter.install(engine.clone()).unwrap();
    }
    let router = ModelRouter::new(adapter.clone(), &RoutingConfig::default());
    let redaction = RedactionService::new(adapter, &PrivacyConfig::default());
    let local = Arc::new(local);
    let remote = Arc::new(remote);
    Fixture {
        chat: ChatOrchestrator::new(router, redaction, local.clone(), remote.clone()),
        engine: engine.unwrap_or_default(),
        local,
        remote,
    }
}

fn default_fixture(score: u8, names: &'static [(&'static str, &'static str)]) -> Fixture {
    fixture(
        Some(scripted_engine(score, names)),
        MockBackend::new(Backend::Local),
        MockBackend::new(Backend::Remote),
    )
}

async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let fx = default_fixture(1, &[]);
    assert!(fx.chat.send_message("   \n").is_none());
    assert!(fx.chat.messages().is_empty());
    assert!(!fx.chat.is_loading());
}

#[tokio::test]
async fn user_message_and_placeholder_appear_immediately() {
    let fx = fixture(
        Some(scripted_engine(1, &[])),
        MockBackend::new(Backend::Local).gated(),
        MockBackend::new(Backend::Remote),
    );
    let turn = fx.chat.send_message("hello").unwrap();

    let messages = fx.chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, turn.user_id);
    assert_eq!(messages[0].source, MessageSource::User);
    assert_eq!(messages[1].id, turn.reply_id);
    assert_eq!(messages[1].source, MessageSource::Analyzing);
    assert!(fx.chat.is_loading());

    wait_until(|| fx.local.call_count() == 1).await;
    assert_eq!(fx.chat.messages()[1].source, MessageSource::Local);
    fx.local.release();
    turn.wait().await;
    assert!(!fx.chat.is_loading());
}

#[tokio::test]
async fn simple_prompt_streams_from_local() {
    let fx = fixture(
        Some(scripted_engine(2, &[("John Smith", "person")])),
        MockBackend::with_replies(Backend::Local, [MockReply::chunks(["Hi ", "John Smith"])]),
        MockBackend::new(Backend::Remote),
    );
    fx.chat.send_message("I am John Smith").unwrap().wait().await;

    let messages = fx.chat.messages();
    assert_eq!(messages[1].source, MessageSource::Local);
    assert_eq!(messages[1].text, "Hi John Smith");
    assert_eq!(fx.local.calls(), vec![vec![ChatTurn::user("I am John Smith")]]);
    assert_eq!(fx.remote.call_count(), 0);
    // Local turns are never redacted: only the classifier ran.
    assert_eq!(fx.engine.requests().len(), 1);
    assert!(fx.chat.session_macro_map().is_empty());
}

#[tokio::test]
async fn remote_turn_is_redacted_and_restored() {
    let fx = fixture(
        Some(scripted_engine(1, &[("John Smith", "person"), ("Acme", "organization")])),
        MockBackend::new(Backend::Local),
        MockBackend::with_replies(
            Backend::Remote,
            [MockReply::chunks(["Hello PERSON_1", ", welcome to ORG_1."])],
        ),
    );
    fx.chat
        .send_message("Tell @REMOTE John Smith about Acme")
        .unwrap()
        .wait()
        .await;

    let calls = fx.remote.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], vec![ChatTurn::user("Tell PERSON_1 about ORG_1")]);

    let messages = fx.chat.messages();
    assert_eq!(messages[0].text, "Tell @REMOTE John Smith about Acme");
    assert_eq!(messages[1].source, MessageSource::Remote);
    assert_eq!(messages[1].text, "Hello John Smith, welcome to Acme.");
    assert_eq!(fx.local.call_count(), 0);
}

#[tokio::test]
async fn streamed_remote_text_only_grows_and_hides_pseudonyms() {
    let receiver: Arc<OnceLock<watch::Receiver<ChatSnapshot>>> = Arc::new(OnceLock::new());
    let shown: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let remote = {
        let receiver = Arc::clone(&receiver);
        let shown = Arc::clone(&shown);
        MockBackend::with_replies(
            Backend::Remote,
            [MockReply::chunks(["Hello PERS", "ON_1", ", and ", "welcome to ORG_", "1."])],
        )
        .after_each_partial(move || {
            if let Some(rx) = receiver.get() {
                let text = rx.borrow().messages.last().map(|m| m.text.clone());
                shown.lock().unwrap().extend(text);
            }
        })
    };
    let fx = fixture(
        Some(scripted_engine(1, &[("John Smith", "person"), ("Acme", "organization")])),
        MockBackend::new(Backend::Local),
        remote,
    );
    receiver.set(fx.chat.subscribe()).unwrap();

    fx.chat
        .send_message("@remote Tell John Smith about Acme")
        .unwrap()
        .wait()
        .await;

    assert_eq!(
        *shown.lock().unwrap(),
        vec![
            "Hello ",
            "Hello John Smith",
            "Hello John Smith, and ",
            "Hello John Smith, and welcome to ",
            "Hello John Smith, and welcome to Acme.",
        ]
    );
    assert_eq!(fx.chat.messages()[1].text, "Hello John Smith, and welcome to Acme.");
}

#[tokio::test]
async fn remote_history_redacts_user_turns_only() {
    let fx = fixture(
        Some(scripted_engine(1, &[("John Smith", "person")])),
        MockBackend::with_replies(Backend::Local, [MockReply::text("Nice to meet you, John Smith")]),
        MockBackend::with_replies(Backend::Remote, [MockReply::text("You are PERSON_1")]),
    );
    fx.chat.send_message("I am John Smith").unwrap().wait().await;
    fx.chat.send_message("@remote who am I?").unwrap().wait().await;

    assert_eq!(
        fx.remote.calls()[0],
        vec![
            ChatTurn::user("I am PERSON_1"),
            ChatTurn::assistant("Nice to meet you, John Smith"),
            ChatTurn::user("who am I?"),
        ]
    );
    assert_eq!(fx.chat.messages()[3].text, "You are John Smith");

    let detector_inputs: Vec<String> = fx
        .engine
        .requests()
        .into_iter()
        .filter(|r| r.messages[0].content.contains("privacy filter"))
        .map(|r| r.messages[1].content.clone())
        .collect();
    assert_eq!(detector_inputs.len(), 2);
    assert!(detector_inputs.iter().all(|p| !p.contains("Nice to meet you")));
}

#[tokio::test]
async fn long_prompt_goes_remote_despite_low_score() {
    let fx = default_fixture(1, &[]);
    let prompt = vec!["word"; 120].join(" ");
    fx.chat.send_message(&prompt).unwrap().wait().await;
    assert_eq!(fx.remote.call_count(), 1);
    assert_eq!(fx.local.call_count(), 0);
    assert_eq!(fx.chat.messages()[1].source, MessageSource::Remote);
}

#[tokio::test]
async fn high_score_goes_remote() {
    let fx = default_fixture(5, &[]);
    fx.chat.send_message("Prove the four colour theorem").unwrap().wait().await;
    assert_eq!(fx.remote.call_count(), 1);
}

#[tokio::test]
async fn backend_failure_replaces_only_the_placeholder() {
    let fx = fixture(
        Some(scripted_engine(1, &[])),
        MockBackend::new(Backend::Local),
        MockBackend::with_replies(
            Backend::Remote,
            [MockReply::backend_error("Incorrect API key provided")],
        ),
    );
    fx.chat.send_message("@remote hi").unwrap().wait().await;

    let messages = fx.chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "@remote hi");
    assert_eq!(messages[0].source, MessageSource::User);
    assert_eq!(messages[1].source, MessageSource::Error);
    assert_eq!(messages[1].text, "Incorrect API key provided");
    assert!(!fx.chat.is_loading());
}

#[tokio::test]
async fn missing_key_fails_the_turn_not_the_session() {
    let fx = fixture(
        Some(scripted_engine(1, &[])),
        MockBackend::new(Backend::Local),
        MockBackend::with_replies(
            Backend::Remote,
            [MockReply::Fail(MockFailure::Config("OpenAI API key not found".into()))],
        ),
    );
    fx.chat.send_message("@remote hi").unwrap().wait().await;
    assert_eq!(fx.chat.messages()[1].text, "OpenAI API key not found");

    fx.chat.send_message("@local hi again").unwrap().wait().await;
    let messages = fx.chat.messages();
    assert_eq!(messages[3].source, MessageSource::Local);
    assert_eq!(messages[3].text, "mock response");
    // The failed reply stays in the history the next turn sees.
    assert_eq!(fx.local.calls()[0][1], ChatTurn::assistant("OpenAI API key not found"));
}

#[tokio::test]
async fn unready_engine_surfaces_as_turn_error() {
    let fx = fixture(None, MockBackend::new(Backend::Local), MockBackend::new(Backend::Remote));
    fx.chat.send_message("hello").unwrap().wait().await;
    let reply = &fx.chat.messages()[1];
    assert_eq!(reply.source, MessageSource::Error);
    assert!(reply.text.contains("still loading"));
    assert_eq!(fx.local.call_count(), 0);
}

#[tokio::test]
async fn classifier_garbage_routes_local() {
    let engine = MockEngine::with_responder(|_| MockReply::text("I think it is medium?"));
    let fx = fixture(
        Some(engine),
        MockBackend::new(Backend::Local),
        MockBackend::new(Backend::Remote),
    );
    fx.chat.send_message("hello").unwrap().wait().await;
    assert_eq!(fx.chat.messages()[1].source, MessageSource::Local);
}

#[tokio::test]
async fn detector_failure_still_sends_remote() {
    let engine = MockEngine::with_responder(|req| {
        if req.messages[0].content.contains("privacy filter") {
            MockReply::backend_error("detector crashed")
        } else {
            MockReply::text(r#"{"score": 5, "explanation": "hard"}"#)
        }
    });
    let fx = fixture(
        Some(engine),
        MockBackend::new(Backend::Local),
        MockBackend::with_replies(Backend::Remote, [MockReply::text("ok")]),
    );
    fx.chat.send_message("Ask John Smith").unwrap().wait().await;
    assert_eq!(fx.remote.calls()[0], vec![ChatTurn::user("Ask John Smith")]);
    assert_eq!(fx.chat.messages()[1].text, "ok");
}

#[tokio::test]
async fn overlapping_turns_keep_their_own_placeholders() {
    let fx = fixture(
        Some(scripted_engine(1, &[])),
        MockBackend::with_replies(Backend::Local, [MockReply::text("one"), MockReply::text("two")])
            .gated(),
        MockBackend::new(Backend::Remote),
    );
    let first = fx.chat.send_message("first").unwrap();
    wait_until(|| fx.local.call_count() == 1).await;
    let second = fx.chat.send_message("second").unwrap();
    wait_until(|| fx.local.call_count() == 2).await;

    assert_ne!(first.reply_id, second.reply_id);
    // The first turn's in-flight placeholder is not echoed into the second.
    assert_eq!(
        fx.local.calls()[1],
        vec![ChatTurn::user("first"), ChatTurn::user("second")]
    );
    assert!(fx.chat.is_loading());

    fx.local.release();
    fx.local.release();
    first.wait().await;
    second.wait().await;

    let messages = fx.chat.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].text, "first");
    assert_eq!(messages[1].text, "one");
    assert_eq!(messages[2].text, "second");
    assert_eq!(messages[3].text, "two");
    assert!(!fx.chat.is_loading());
}

#[tokio::test]
async fn subscribers_observe_loading_and_result() {
    let fx = default_fixture(1, &[]);
    let mut rx = fx.chat.subscribe();
    let turn = fx.chat.send_message("hello").unwrap();
    assert!(rx.borrow_and_update().is_loading);

    turn.wait().await;
    let snap = rx.borrow_and_update().clone();
    assert!(!snap.is_loading);
    assert_eq!(snap.messages[1].text, "mock response");
}

#[tokio::test]
async fn clear_session_and_reset() {
    let fx = fixture(
        Some(scripted_engine(1, &[("Jane Doe", "person")])),
        MockBackend::new(Backend::Local),
        MockBackend::new(Backend::Remote),
    );
    fx.chat.send_message("@remote Jane Doe").unwrap().wait().await;
    assert_eq!(fx.chat.session_macro_map()["PERSON_1"], "Jane Doe");

    fx.chat.clear_session();
    assert!(fx.chat.session_macro_map().is_empty());
    assert_eq!(fx.chat.messages().len(), 2);

    fx.chat.reset();
    assert!(fx.chat.messages().is_empty());
}
