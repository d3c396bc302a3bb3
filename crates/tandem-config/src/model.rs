// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tandem chat router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tandem configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TandemConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Remote completions API settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Local engine settings.
    #[serde(default)]
    pub local: LocalConfig,

    /// Backend routing settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// PII redaction settings.
    #[serde(default)]
    pub privacy: PrivacyConfig,
}

/// Assistant identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System preamble both adapters prepend to every chat request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_agent_name() -> String {
    "tandem".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant.".to_string()
}

/// Remote completions API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Chat completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Remote model identifier.
    #[serde(default = "default_remote_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retries on a transient status before any frame has been received.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whole-request timeout in seconds. `None` leaves it to the transport.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_remote_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            timeout_secs: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_remote_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_max_retries() -> u32 {
    1
}

/// Local engine configuration.
///
/// The engine is configured once at startup; `model_url`, `model_lib` and
/// `vram_required_mb` describe the model artifact and its resource needs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    /// Base URL of the local Ollama daemon.
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_local_model")]
    pub model: String,

    /// Reuse an already-downloaded model instead of pulling it again.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Model artifact URL. A Hugging Face URL is pulled as `hf.co/<owner>/<repo>`.
    #[serde(default)]
    pub model_url: Option<String>,

    /// Executable-library URL for engines that ship their runtime separately.
    #[serde(default)]
    pub model_lib: Option<String>,

    /// Minimum memory the model needs, in MiB.
    #[serde(default)]
    pub vram_required_mb: Option<f64>,

    /// Ask the engine to trade speed for a smaller memory footprint.
    #[serde(default)]
    pub low_resource: bool,

    /// Context window override in tokens.
    #[serde(default = "default_context_window_size")]
    pub context_window_size: Option<u32>,

    /// Sampling temperature for chat replies.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per chat reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            model: default_local_model(),
            use_cache: default_use_cache(),
            model_url: None,
            model_lib: None,
            vram_required_mb: None,
            low_resource: false,
            context_window_size: default_context_window_size(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_local_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_local_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_use_cache() -> bool {
    true
}

fn default_context_window_size() -> Option<u32> {
    Some(4096)
}

/// Backend routing configuration.
///
/// Scores from the complexity classifier are clamped to `min_score..=max_score`;
/// a score at or above `score_threshold` routes remote. Prompts longer than
/// `word_threshold` words always route remote.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Literal tag that forces the remote backend.
    #[serde(default = "default_remote_tag")]
    pub remote_tag: String,

    /// Literal tag that forces the local backend.
    #[serde(default = "default_local_tag")]
    pub local_tag: String,

    /// Word count above which the remote backend is forced.
    #[serde(default = "default_word_threshold")]
    pub word_threshold: usize,

    /// Lowest score the classifier can report.
    #[serde(default = "default_min_score")]
    pub min_score: u8,

    /// Highest score the classifier can report.
    #[serde(default = "default_max_score")]
    pub max_score: u8,

    /// Scores at or above this value route remote.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: u8,

    /// Sampling temperature for classification calls.
    #[serde(default = "default_classifier_temperature")]
    pub classifier_temperature: f32,

    /// Output bound for classification calls.
    #[serde(default = "default_classifier_max_tokens")]
    pub classifier_max_tokens: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            remote_tag: default_remote_tag(),
            local_tag: default_local_tag(),
            word_threshold: default_word_threshold(),
            min_score: default_min_score(),
            max_score: default_max_score(),
            score_threshold: default_score_threshold(),
            classifier_temperature: default_classifier_temperature(),
            classifier_max_tokens: default_classifier_max_tokens(),
        }
    }
}

fn default_remote_tag() -> String {
    "@remote".to_string()
}

fn default_local_tag() -> String {
    "@local".to_string()
}

fn default_word_threshold() -> usize {
    100
}

fn default_min_score() -> u8 {
    1
}

fn default_max_score() -> u8 {
    5
}

fn default_score_threshold() -> u8 {
    3
}

fn default_classifier_temperature() -> f32 {
    0.1
}

fn default_classifier_max_tokens() -> u32 {
    200
}

/// PII redaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrivacyConfig {
    /// Redact person and organization names before any remote call.
    #[serde(default = "default_privacy_enabled")]
    pub enabled: bool,

    /// Output bound for entity detection calls.
    #[serde(default = "default_detection_max_tokens")]
    pub detection_max_tokens: u32,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            enabled: default_privacy_enabled(),
            detection_max_tokens: default_detection_max_tokens(),
        }
    }
}

fn default_privacy_enabled() -> bool {
    true
}

fn default_detection_max_tokens() -> u32 {
    500
}
