// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured-output support: JSON schemas for requests and best-effort
//! JSON extraction from replies.
//!
//! Small local models often ignore the requested format and wrap the JSON in
//! prose or a markdown fence. Extraction tries, in order: the whole reply, the
//! first fenced code block, then every balanced `{...}` substring from left to
//! right. The first candidate that deserializes into the target type wins.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use tandem_core::TandemError;
use tandem_core::types::ResponseFormat;

/// The JSON schema for `T`, wrapped as a request format.
pub fn response_format_for<T: JsonSchema>() -> Result<ResponseFormat, TandemError> {
    let schema = schemars::schema_for!(T);
    let schema = serde_json::to_string(&schema)
        .map_err(|e| TandemError::Internal(format!("failed to serialize JSON schema: {e}")))?;
    Ok(ResponseFormat { schema })
}

/// Extract a `T` from free-form model output, or `None` if nothing fits.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(block) = fenced_block(text)
        && let Ok(value) = serde_json::from_str(block.trim())
    {
        return Some(value);
    }

    let mut offset = 0;
    while let Some((start, end)) = balanced_object(&text[offset..]) {
        let candidate = &text[offset + start..offset + end];
        if let Ok(value) = serde_json::from_str(candidate) {
            return Some(value);
        }
        offset += start + 1;
    }

    None
}

/// Contents of the first ``` fence, without its info string.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    let body_start = after_ticks.find('\n').map(|i| i + 1)?;
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Byte range of the first balanced `{...}` in `text`, ignoring braces inside
/// JSON string literals.
fn balanced_object(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, i + 1));
                }
            }
            _ => {}
        }
    }

    None
}
