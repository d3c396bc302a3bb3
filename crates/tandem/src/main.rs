// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tandem - chat with a local model, escalating to a remote one when needed.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod shell;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use tandem::app::App;
use tandem_config::TandemConfig;
use tandem_core::TandemError;
use tandem_openai::client::API_KEY_ENV;
use tandem_privacy::{MASK, MaskingWriter};

/// Tandem - chat with a local model, escalating to a remote one when needed.
#[derive(Parser, Debug)]
#[command(name = "tandem", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive chat session (default).
    Shell,
    /// Send a single message and print the reply.
    Ask {
        /// Message text. Prefix with a backend tag to force routing.
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Show backend readiness.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration with secrets masked.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tandem_config::load_and_validate_path(path),
        None => tandem_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tandem_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level, known_secrets(&config));

    if let Err(e) = run(cli.command.unwrap_or(Commands::Shell), config).await {
        eprintln!("{}: {}", "error".red(), e.user_message());
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: TandemConfig) -> Result<(), TandemError> {
    match command {
        Commands::Shell => shell::run_shell(App::build(config)?).await,
        Commands::Ask { text } => shell::run_ask(App::build(config)?, &text.join(" ")).await,
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
        Commands::Config => {
            print!("{}", render_config(&config)?);
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber, masking known secrets in every line.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str, secrets: Vec<String>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tandem={log_level},warn")));
    let secrets = Arc::new(secrets);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(move || MaskingWriter::new(std::io::stderr(), Arc::clone(&secrets)))
        .init();
}

fn known_secrets(config: &TandemConfig) -> Vec<String> {
    config
        .remote
        .api_key
        .clone()
        .into_iter()
        .chain(std::env::var(API_KEY_ENV).ok())
        .filter(|s| !s.is_empty())
        .collect()
}

fn render_config(config: &TandemConfig) -> Result<String, TandemError> {
    let mut shown = config.clone();
    if shown.remote.api_key.is_some() {
        shown.remote.api_key = Some(MASK.to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| TandemError::Internal(format!("failed to render config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn config_output_masks_api_key() {
        let mut config = TandemConfig::default();
        config.remote.api_key = Some("sk-test-abcdefghijklmnopqrstuvwxyz".to_string());

        let out = render_config(&config).unwrap();
        assert!(!out.contains("sk-test"));
        assert!(out.contains("api_key = \"[REDACTED]\""));
        assert!(out.contains("[routing]"));
    }

    #[test]
    fn rendered_config_loads_back() {
        let out = render_config(&TandemConfig::default()).unwrap();
        let parsed = tandem_config::load_and_validate_str(&out).unwrap();
        assert_eq!(parsed.agent.name, "tandem");
        assert_eq!(parsed.routing.word_threshold, 100);
    }

    #[test]
    fn ask_joins_trailing_words() {
        let cli = Cli::parse_from(["tandem", "ask", "@remote", "hello", "there"]);
        match cli.command {
            Some(Commands::Ask { text }) => assert_eq!(text.join(" "), "@remote hello there"),
            other => panic!("expected ask, got {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_defaults_to_shell() {
        let cli = Cli::parse_from(["tandem"]);
        assert!(cli.command.is_none());
    }
}
