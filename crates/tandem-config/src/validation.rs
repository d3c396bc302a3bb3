// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Covers constraints serde cannot express: URL syntax, score ordering,
//! tag shape and numeric ranges. All failures are collected, not just the first.

use crate::diagnostic::ConfigError;
use crate::model::TandemConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &TandemConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "agent.log_level `{}` is not one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    check_url(&mut errors, "remote.api_url", &config.remote.api_url);
    check_url(&mut errors, "local.base_url", &config.local.base_url);
    if let Some(model_url) = &config.local.model_url {
        check_url(&mut errors, "local.model_url", model_url);
    }
    if let Some(model_lib) = &config.local.model_lib {
        check_url(&mut errors, "local.model_lib", model_lib);
    }

    if config.remote.model.trim().is_empty() {
        errors.push(ConfigError::validation("remote.model must not be empty"));
    }
    if config.local.model.trim().is_empty() {
        errors.push(ConfigError::validation("local.model must not be empty"));
    }

    check_temperature(&mut errors, "remote.temperature", config.remote.temperature);
    check_temperature(&mut errors, "local.temperature", config.local.temperature);
    check_temperature(
        &mut errors,
        "routing.classifier_temperature",
        config.routing.classifier_temperature,
    );

    for (key, value) in [
        ("remote.max_tokens", config.remote.max_tokens),
        ("local.max_tokens", config.local.max_tokens),
        (
            "routing.classifier_max_tokens",
            config.routing.classifier_max_tokens,
        ),
        (
            "privacy.detection_max_tokens",
            config.privacy.detection_max_tokens,
        ),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!(
                "{key} must be greater than zero"
            )));
        }
    }

    if config.local.context_window_size == Some(0) {
        errors.push(ConfigError::validation(
            "local.context_window_size must be greater than zero when set",
        ));
    }

    if let Some(vram) = config.local.vram_required_mb
        && !(vram.is_finite() && vram >= 0.0)
    {
        errors.push(ConfigError::validation(format!(
            "local.vram_required_mb must be a non-negative number, got {vram}"
        )));
    }

    let routing = &config.routing;
    if routing.word_threshold == 0 {
        errors.push(ConfigError::validation(
            "routing.word_threshold must be greater than zero",
        ));
    }
    if !(routing.min_score <= routing.score_threshold
        && routing.score_threshold <= routing.max_score)
    {
        errors.push(ConfigError::validation(format!(
            "routing scores must satisfy min_score <= score_threshold <= max_score, got {} <= {} <= {}",
            routing.min_score, routing.score_threshold, routing.max_score
        )));
    }

    check_tag(&mut errors, "routing.remote_tag", &routing.remote_tag);
    check_tag(&mut errors, "routing.local_tag", &routing.local_tag);
    if routing.remote_tag.eq_ignore_ascii_case(&routing.local_tag) {
        errors.push(ConfigError::validation(format!(
            "routing.remote_tag and routing.local_tag must differ, both are `{}`",
            routing.remote_tag
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ConfigError::validation(format!(
            "{key} `{value}` is not a valid URL: {e}"
        )));
    }
}

fn check_temperature(errors: &mut Vec<ConfigError>, key: &str, value: f32) {
    if !(0.0..=2.0).contains(&value) {
        errors.push(ConfigError::validation(format!(
            "{key} must be between 0.0 and 2.0, got {value}"
        )));
    }
}

fn check_tag(errors: &mut Vec<ConfigError>, key: &str, tag: &str) {
    if tag.is_empty() || tag.chars().any(char::is_whitespace) {
        errors.push(ConfigError::validation(format!(
            "{key} must be non-empty and contain no whitespace, got `{tag}`"
        )));
    }
}
