// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit backend tags in raw user input.
//!
//! A tag is a literal substring such as `@remote`, matched ASCII
//! case-insensitively. When both tags are present the remote tag wins. Only the
//! first occurrence of the winning tag is removed, and the text on either side
//! is trimmed and joined with a single space.

use tandem_core::types::Backend;

/// The pair of literal tags that force a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTags {
    pub remote: String,
    pub local: String,
}

impl BackendTags {
    pub fn new(remote: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            local: local.into(),
        }
    }

    /// The forced backend and the text with the tag removed, if a tag is present.
    pub fn detect(&self, text: &str) -> Option<(Backend, String)> {
        [(Backend::Remote, &self.remote), (Backend::Local, &self.local)]
            .into_iter()
            .find_map(|(backend, tag)| {
                find_ignore_ascii_case(text, tag).map(|at| (backend, strip_at(text, at, tag.len())))
            })
    }
}

impl Default for BackendTags {
    fn default() -> Self {
        Self::new("@remote", "@local")
    }
}

/// Byte offset of the first ASCII case-insensitive match of `needle`.
///
/// The offset is always a char boundary: non-ASCII bytes only match themselves,
/// and `needle` starts on a boundary.
pub fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let (hay, pat) = (haystack.as_bytes(), needle.as_bytes());
    if pat.is_empty() || pat.len() > hay.len() {
        return None;
    }
    hay.windows(pat.len()).position(|w| w.eq_ignore_ascii_case(pat))
}

fn strip_at(text: &str, at: usize, len: usize) -> String {
    let before = text[..at].trim();
    let after = text[at + len..].trim();
    format!("{before} {after}").trim().to_string()
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
