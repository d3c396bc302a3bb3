// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring and terminal rendering for the `tandem` binary.

pub mod app;
pub mod render;
