// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Privacy protection for the Tandem chat router.
//!
//! [`RedactionService`] replaces person and organization names with
//! session-stable pseudonyms before text reaches the remote backend and maps
//! them back in replies. [`secrets`] keeps credentials out of logs.

pub mod detect;
pub mod entity;
pub mod redact;
pub mod secrets;
pub mod session;

pub use entity::{EntityKind, PiiEntity};
pub use redact::{RedactedExchange, RedactionResult, RedactionService};
pub use secrets::{MASK, MaskingWriter, mask_secrets};
pub use session::{MacroMap, MacroSession};
