// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Render-ready view of a log entry.

use contactdesk_chart::{ChartSpec, extract_chart};
use contactdesk_core::types::Message;

use crate::log::LogEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMessage {
    pub message: Message,
    /// Content with any embedded chart removed.
    pub text: String,
    pub chart: Option<ChartSpec>,
    pub pending: bool,
}

impl From<&LogEntry> for DisplayMessage {
    fn from(entry: &LogEntry) -> Self {
        let extraction = extract_chart(&entry.message.content);
        Self {
            message: entry.message.clone(),
            text: extraction.text,
            chart: extraction.spec,
            pending: entry.pending,
        }
    }
}
