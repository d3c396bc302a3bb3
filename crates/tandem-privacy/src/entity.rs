// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detected PII entities and how they are located in text.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The two entity kinds that are redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
}

impl EntityKind {
    /// Prefix of the pseudonyms issued for this kind.
    pub fn macro_prefix(self) -> &'static str {
        match self {
            EntityKind::Person => "PERSON",
            EntityKind::Organization => "ORG",
        }
    }
}

/// A name located in a specific text.
///
/// `start..end` is a byte range on char boundaries of the text it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiEntity {
    /// The name as reported by the detector.
    pub name: String,
    pub kind: EntityKind,
    pub start: usize,
    pub end: usize,
}

impl PiiEntity {
    /// Locate `name` in `text` by case-insensitive first-occurrence search.
    ///
    /// Returns `None` when the name does not occur. A name that occurs more
    /// than once always resolves to its first occurrence.
    pub fn locate(name: &str, kind: EntityKind, text: &str) -> Option<Self> {
        let (start, end) = find_ignore_case(text, name)?;
        Some(Self {
            name: name.to_string(),
            kind,
            start,
            end,
        })
    }
}

/// Byte span of the first case-insensitive occurrence of `needle`.
///
/// Comparison uses Unicode lowercase mapping; the span covers the matched
/// characters of `haystack`, which may differ in byte length from `needle`.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.trim().is_empty() {
        return None;
    }
    haystack
        .char_indices()
        .find_map(|(start, _)| match_len(&haystack[start..], needle).map(|len| (start, start + len)))
}

fn match_len(hay: &str, needle: &str) -> Option<usize> {
    let mut want = needle.chars().flat_map(char::to_lowercase).peekable();
    for (i, c) in hay.char_indices() {
        for lower in c.to_lowercase() {
            if want.next() != Some(lower) {
                return None;
            }
        }
        if want.peek().is_none() {
            return Some(i + c.len_utf8());
        }
    }
    None
}
