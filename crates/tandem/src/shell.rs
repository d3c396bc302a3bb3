// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tandem shell` and `tandem ask`.
//!
//! The shell is a readline REPL; the local model loads in the background
//! behind a progress bar and replies stream to stdout as they arrive.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use tandem::app::App;
use tandem::render::{Piece, ReplyPrinter};
use tandem_agent::{ChatOrchestrator, TurnHandle};
use tandem_core::TandemError;
use tandem_core::types::{Message, MessageSource};
use tandem_local::InitProgress;

/// Runs the interactive REPL until `/quit` or end of input.
pub async fn run_shell(app: App) -> Result<(), TandemError> {
    let app = Arc::new(app);
    spawn_local_load(Arc::clone(&app));

    let mut rl = DefaultEditor::new()
        .map_err(|e| TandemError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", app.config.agent.name).bold().green());
    println!(
        "Prefix a message with {} or {} to pick a backend. Commands: {}, {}, {}, {}.\n",
        app.config.routing.remote_tag.cyan(),
        app.config.routing.local_tag.cyan(),
        "/clear".yellow(),
        "/reset".yellow(),
        "/map".yellow(),
        "/quit".yellow(),
    );

    let prompt = format!("{}> ", app.config.agent.name.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match trimmed {
                    "/quit" | "/exit" => break,
                    "/clear" => {
                        app.chat.clear_session();
                        println!("{}", "privacy session cleared".dimmed());
                    }
                    "/reset" => {
                        app.chat.reset();
                        println!("{}", "conversation reset".dimmed());
                    }
                    "/map" => print_macro_map(&app.chat),
                    _ => {
                        if let Some(turn) = app.chat.send_message(&line) {
                            stream_turn(&app.chat, turn).await;
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Sends one message and prints the reply. Fails if the turn failed.
pub async fn run_ask(app: App, text: &str) -> Result<(), TandemError> {
    let bar = progress_bar();
    let loaded = app.load_local(progress_reporter(bar.clone())).await;
    bar.finish_and_clear();
    if let Err(e) = &loaded {
        warn!(error = %e, "local model unavailable");
        eprintln!("{}: {}", "warning".yellow(), e.user_message());
    }

    let Some(turn) = app.chat.send_message(text) else {
        return Err(TandemError::Config("nothing to send".to_string()));
    };
    match stream_turn(&app.chat, turn).await {
        Some(reply) if reply.source == MessageSource::Error => Err(TandemError::backend(reply.text)),
        _ => Ok(()),
    }
}

fn spawn_local_load(app: Arc<App>) {
    tokio::spawn(async move {
        let bar = progress_bar();
        match app.load_local(progress_reporter(bar.clone())).await {
            Ok(()) => bar.finish_with_message("local model ready"),
            Err(e) => {
                bar.abandon_with_message(format!("local model failed to load: {}", e.user_message()));
                warn!(error = %e, "local model failed to load");
            }
        }
    });
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {percent:>3}% {msg}") {
        bar.set_style(style);
    }
    bar
}

fn progress_reporter(bar: ProgressBar) -> impl Fn(InitProgress) + Send + Sync {
    move |p: InitProgress| {
        bar.set_position((p.progress * 100.0).round() as u64);
        bar.set_message(p.text);
    }
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("routing...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Print a turn's reply as it streams; returns the final reply message.
async fn stream_turn(chat: &ChatOrchestrator, turn: TurnHandle) -> Option<Message> {
    let mut rx = chat.subscribe();
    let reply_id = turn.reply_id.clone();
    let mut printer = ReplyPrinter::new(reply_id.clone());
    let spinner = thinking_spinner();

    let done = turn.wait();
    tokio::pin!(done);
    loop {
        tokio::select! {
            _ = &mut done => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                emit(printer.update(&snapshot, false), &spinner);
            }
        }
    }

    let snapshot = rx.borrow().clone();
    emit(printer.update(&snapshot, true), &spinner);
    spinner.finish_and_clear();
    println!();

    let reply = snapshot.messages.into_iter().find(|m| m.id == reply_id);
    if let Some(reply) = &reply {
        info!(source = %reply.source, len = reply.text.len(), "reply shown");
    }
    reply
}

fn emit(pieces: Vec<Piece>, spinner: &ProgressBar) {
    if pieces.is_empty() {
        return;
    }
    if !spinner.is_finished() {
        spinner.finish_and_clear();
    }

    let mut out = std::io::stdout().lock();
    for piece in pieces {
        match piece {
            Piece::Routed(MessageSource::Remote) => {
                let _ = write!(out, "{} ", "[remote]".cyan());
            }
            Piece::Routed(_) => {
                let _ = write!(out, "{} ", "[local]".dimmed());
            }
            Piece::Text(text) => {
                let _ = write!(out, "{text}");
            }
            Piece::Failed(message) => {
                let _ = write!(out, "{}: {message}", "error".red());
            }
        }
    }
    let _ = out.flush();
}

fn print_macro_map(chat: &ChatOrchestrator) {
    let map = chat.session_macro_map();
    if map.is_empty() {
        println!("{}", "no pseudonyms issued in this session".dimmed());
        return;
    }
    for (token, name) in map {
        println!("  {} -> {name}", token.cyan());
    }
}
