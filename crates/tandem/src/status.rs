// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tandem status` command implementation.
//!
//! Reports whether the local model is downloaded and whether the remote
//! backend has credentials. Never pulls a model or sends a chat request.

use std::io::IsTerminal;

use serde::Serialize;

use tandem_config::TandemConfig;
use tandem_core::TandemError;
use tandem_core::traits::PluginAdapter;
use tandem_core::types::HealthStatus;
use tandem_local::OllamaEngine;
use tandem_local::engine::model_reference;
use tandem_openai::RemoteAdapter;

/// Readiness of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendState {
    Ready,
    NotDownloaded,
    Unreachable,
    Unconfigured,
}

impl BackendState {
    fn label(&self) -> &'static str {
        match self {
            BackendState::Ready => "ready",
            BackendState::NotDownloaded => "not downloaded",
            BackendState::Unreachable => "unreachable",
            BackendState::Unconfigured => "not configured",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BackendReport {
    pub state: BackendState,
    pub model: String,
    pub detail: Option<String>,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub local: BackendReport,
    pub remote: BackendReport,
    pub privacy_enabled: bool,
}

fn local_report(config: &TandemConfig, probe: Result<bool, TandemError>) -> BackendReport {
    let model = model_reference(&config.local);
    match probe {
        Ok(true) => BackendReport {
            state: BackendState::Ready,
            model,
            detail: None,
        },
        Ok(false) => BackendReport {
            state: BackendState::NotDownloaded,
            model,
            detail: Some("pulled on first `tandem shell`".to_string()),
        },
        Err(e) => BackendReport {
            state: BackendState::Unreachable,
            model,
            detail: Some(format!("{} ({e})", config.local.base_url)),
        },
    }
}

fn remote_report(config: &TandemConfig, health: Result<HealthStatus, TandemError>) -> BackendReport {
    let model = config.remote.model.clone();
    match health {
        Ok(HealthStatus::Healthy) => BackendReport {
            state: BackendState::Ready,
            model,
            detail: None,
        },
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => BackendReport {
            state: BackendState::Unconfigured,
            model,
            detail: Some(reason),
        },
        Err(e) => BackendReport {
            state: BackendState::Unconfigured,
            model,
            detail: Some(e.to_string()),
        },
    }
}

/// Run the `tandem status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: &TandemConfig, json: bool, plain: bool) -> Result<(), TandemError> {
    let probe = OllamaEngine::probe(&config.local).await;
    let remote = RemoteAdapter::new(config)?;
    let health = remote.health_check().await;

    let report = StatusReport {
        local: local_report(config, probe),
        remote: remote_report(config, health),
        privacy_enabled: config.privacy.enabled,
    };

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| TandemError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{out}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_report(&report, use_color);
    }
    Ok(())
}

fn print_report(report: &StatusReport, use_color: bool) {
    println!();
    println!("  tandem status");
    println!("  {}", "-".repeat(35));
    print_backend("Local", &report.local, use_color);
    print_backend("Remote", &report.remote, use_color);
    let privacy = if report.privacy_enabled { "on" } else { "off" };
    println!("    Privacy:  {privacy}");
    println!();
}

fn print_backend(label: &str, backend: &BackendReport, use_color: bool) {
    let ok = backend.state == BackendState::Ready;
    let state = backend.state.label();
    let pad = " ".repeat(8usize.saturating_sub(label.len()));

    if use_color {
        use colored::Colorize;
        let (mark, state) = if ok {
            ("✓".green(), state.green())
        } else {
            ("✗".red(), state.red())
        };
        println!("    {label}:{pad}  {mark} {state} ({})", backend.model);
    } else {
        let mark = if ok { "[OK]" } else { "[FAIL]" };
        println!("    {label}:{pad}  {mark} {state} ({})", backend.model);
    }
    if let Some(detail) = &backend.detail {
        println!("              {detail}");
    }
}
