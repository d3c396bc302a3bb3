// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Masking of API credentials in log output and printed configuration.
//!
//! Pattern matching catches key-shaped strings; exact matching catches the
//! configured key whatever its shape.

use std::io::Write;
use std::sync::{Arc, LazyLock};

use regex::Regex;

const SECRET_PATTERNS: &[&str] = &[
    // OpenAI-style keys, including project keys: sk-..., sk-proj-...
    r"sk-[A-Za-z0-9_\-]{20,}",
    r"Bearer\s+[A-Za-z0-9._\-]{10,}",
];

static SECRET_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SECRET_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

pub const MASK: &str = "[REDACTED]";

/// Mask key-shaped substrings and every non-empty `known` value.
pub fn mask_secrets(input: &str, known: &[String]) -> String {
    let mut out = SECRET_REGEXES
        .iter()
        .fold(input.to_string(), |acc, re| re.replace_all(&acc, MASK).into_owned());

    let mut known: Vec<&String> = known.iter().filter(|k| !k.is_empty()).collect();
    known.sort_by_key(|k| std::cmp::Reverse(k.len()));
    for value in known {
        out = out.replace(value.as_str(), MASK);
    }
    out
}

/// A writer that masks secrets before passing bytes on.
pub struct MaskingWriter<W> {
    inner: W,
    known: Arc<Vec<String>>,
}

impl<W: Write> MaskingWriter<W> {
    pub fn new(inner: W, known: Arc<Vec<String>>) -> Self {
        Self { inner, known }
    }
}

impl<W: Write> Write for MaskingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(mask_secrets(&text, &self.known).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
