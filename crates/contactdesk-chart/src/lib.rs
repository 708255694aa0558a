// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chart-spec extraction for contactdesk message content.
//!
//! Agent and assistant messages may embed a small JSON chart description
//! (`{"type": "pie"|"bar"|"line", "data": [{"name", "value"}], "title"?}`).
//! [`extract_chart`] finds it, parses it, and returns the remaining prose.
//! Malformed content is never an error: it simply yields no chart.

pub mod extract;
pub mod lexer;
pub mod spec;

pub use extract::{Extraction, Strategy, extract_chart};
pub use spec::{ChartKind, ChartSpec, DataPoint};
