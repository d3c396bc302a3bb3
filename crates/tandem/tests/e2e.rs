// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the assembled application.
//!
//! The local engine is scripted; the remote backend is a real HTTP client
//! talking to a wiremock server that speaks the chat completions SSE format.

use std::sync::Arc;

use tandem::app::App;
use tandem_config::TandemConfig;
use tandem_config::model::RemoteConfig;
use tandem_core::types::{Message, MessageSource};
use tandem_local::LocalAdapter;
use tandem_openai::RemoteAdapter;
use tandem_openai::client::OpenAiClient;
use tandem_test_utils::{MockEngine, MockReply};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PEOPLE: &[(&str, &str)] = &[("Ada Lovelace", "person"), ("Initech", "organization")];

/// Classifies everything as `score`, detects names from [`PEOPLE`] and
/// answers chat with a fixed local reply.
fn engine(score: u8) -> MockEngine {
    MockEngine::with_responder(move |req| {
        let system = &req.messages[0].content;
        let last = req.messages.last().map(|m| m.content.as_str()).unwrap_or("");
        if req.response_format.is_none() {
            return MockReply::chunks(["Local ", "answer."]);
        }
        if system.contains("privacy filter") {
            let found: Vec<String> = PEOPLE
                .iter()
                .filter(|(name, _)| last.contains(name))
                .map(|(name, kind)| format!(r#"{{"name": "{name}", "type": "{kind}"}}"#))
                .collect();
            return MockReply::text(format!(r#"{{"entities": [{}]}}"#, found.join(", ")));
        }
        MockReply::text(format!(r#"{{"score": {score}, "explanation": "fixed"}}"#))
    })
}

fn sse(parts: &[&str]) -> String {
    let mut body: String = parts
        .iter()
        .map(|p| format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{p}\"}}}}]}}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn app(server: &MockServer, score: u8) -> App {
    let config = TandemConfig::default();
    let local = Arc::new(LocalAdapter::new(&config));
    local.install(Arc::new(engine(score))).unwrap();

    let remote_config = RemoteConfig {
        api_url: format!("{}/v1/chat/completions", server.uri()),
        api_key: Some("sk-e2e".to_string()),
        max_retries: 0,
        ..RemoteConfig::default()
    };
    let client = OpenAiClient::new(&remote_config).unwrap();
    let remote = Arc::new(RemoteAdapter::with_client(
        client,
        config.agent.system_prompt.clone(),
    ));
    App::with_adapters(config, local, remote)
}

async fn ask(app: &App, text: &str) -> Message {
    let turn = app.chat.send_message(text).unwrap();
    let reply_id = turn.reply_id.clone();
    turn.wait().await;
    app.chat
        .messages()
        .into_iter()
        .find(|m| m.id == reply_id)
        .unwrap()
}

#[tokio::test]
async fn remote_turn_never_sends_real_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("PERSON_1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse(&["PERSON_1 joined ", "ORG_1 in 1843."])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server, 1);
    let reply = ask(&app, "@remote Where did Ada Lovelace work? Was it Initech?").await;

    assert_eq!(reply.source, MessageSource::Remote);
    assert_eq!(reply.text, "Ada Lovelace joined Initech in 1843.");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains("Ada Lovelace"));
    assert!(!body.contains("Initech"));
    assert!(!body.contains("@remote"));
    assert!(body.contains("Where did PERSON_1 work? Was it ORG_1?"));
}

#[tokio::test]
async fn simple_prompt_stays_local() {
    let server = MockServer::start().await;
    let app = app(&server, 1);

    let reply = ask(&app, "What is 2 + 2?").await;

    assert_eq!(reply.source, MessageSource::Local);
    assert_eq!(reply.text, "Local answer.");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn complex_prompt_goes_remote() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse(&["Remote ", "answer."])),
        )
        .mount(&server)
        .await;
    let app = app(&server, 5);

    let reply = ask(&app, "Prove the four colour theorem").await;

    assert_eq!(reply.source, MessageSource::Remote);
    assert_eq!(reply.text, "Remote answer.");
}

#[tokio::test]
async fn remote_http_error_fails_only_that_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;
    let app = app(&server, 1);

    let failed = ask(&app, "@remote hello").await;
    assert_eq!(failed.source, MessageSource::Error);
    assert_eq!(failed.text, "Incorrect API key provided");

    let next = ask(&app, "hello again").await;
    assert_eq!(next.source, MessageSource::Local);
    assert!(!app.chat.is_loading());
}

#[tokio::test]
async fn session_pseudonyms_survive_across_turns_until_cleared() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse(&["Noted, PERSON_1."])),
        )
        .mount(&server)
        .await;
    let app = app(&server, 1);

    ask(&app, "@remote I am Ada Lovelace").await;
    let reply = ask(&app, "@remote Remember Ada Lovelace?").await;
    assert_eq!(reply.text, "Noted, Ada Lovelace.");
    assert_eq!(
        app.chat.session_macro_map().get("PERSON_1").map(String::as_str),
        Some("Ada Lovelace")
    );

    app.chat.clear_session();
    assert!(app.chat.session_macro_map().is_empty());
}

#[tokio::test]
async fn unloaded_engine_fails_untagged_turns_with_loading_message() {
    let config = TandemConfig::default();
    let local = Arc::new(LocalAdapter::new(&config));
    let remote = Arc::new(RemoteAdapter::new(&config).unwrap());
    let app = App::with_adapters(config, local, remote);

    let reply = ask(&app, "hi").await;
    assert_eq!(reply.source, MessageSource::Error);
    assert!(reply.text.contains("still loading"));
}
