// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locate and remove an embedded chart spec from message content.
//!
//! Strategies run in order and the first successful parse wins:
//! 1. a fenced block labeled `chart` or `json`,
//! 2. the first `{` after a case-insensitive `chart` token,
//! 3. any balanced object whose `"type"` names a known chart kind.
//!
//! Malformed JSON at one strategy falls through to the next.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::lexer::{balanced_object, open_braces};
use crate::spec::ChartSpec;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```[ \t]*(?:chart|json)\b[^\n]*\n(.*?)```").unwrap()
});

static CHART_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)chart").unwrap());

static KNOWN_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""type"\s*:\s*"(?:pie|bar|line)""#).unwrap());

/// Which strategy produced a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FencedBlock,
    ChartToken,
    BareObject,
}

/// Result of scanning message content for a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The parsed chart, if any strategy succeeded.
    pub spec: Option<ChartSpec>,
    /// Content with the chart text removed and trimmed, or the original
    /// content unchanged when no chart was found.
    pub text: String,
    pub strategy: Option<Strategy>,
}

/// Scan `content` for an embedded chart spec.
pub fn extract_chart(content: &str) -> Extraction {
    let found = from_fenced_block(content)
        .map(|hit| (hit, Strategy::FencedBlock))
        .or_else(|| from_chart_token(content).map(|hit| (hit, Strategy::ChartToken)))
        .or_else(|| from_bare_object(content).map(|hit| (hit, Strategy::BareObject)));

    match found {
        Some(((spec, range), strategy)) => {
            debug!(?strategy, kind = ?spec.kind, points = spec.data.len(), "chart extracted");
            let mut text = String::with_capacity(content.len());
            text.push_str(&content[..range.start]);
            text.push_str(&content[range.end..]);
            Extraction {
                spec: Some(spec),
                text: text.trim().to_string(),
                strategy: Some(strategy),
            }
        }
        None => Extraction {
            spec: None,
            text: content.to_string(),
            strategy: None,
        },
    }
}

type Hit = (ChartSpec, Range<usize>);

fn from_fenced_block(content: &str) -> Option<Hit> {
    FENCED_BLOCK.captures_iter(content).find_map(|caps| {
        let whole = caps.get(0)?;
        let body = caps.get(1)?;
        ChartSpec::parse(body.as_str()).map(|spec| (spec, whole.range()))
    })
}

fn from_chart_token(content: &str) -> Option<Hit> {
    CHART_TOKEN.find_iter(content).find_map(|token| {
        let open = open_braces(content, token.end()).next()?;
        let range = balanced_object(content, open)?;
        ChartSpec::parse(&content[range.clone()]).map(|spec| (spec, range))
    })
}

fn from_bare_object(content: &str) -> Option<Hit> {
    open_braces(content, 0).find_map(|open| {
        let range = balanced_object(content, open)?;
        let candidate = &content[range.clone()];
        if !KNOWN_TYPE.is_match(candidate) {
            return None;
        }
        ChartSpec::parse(candidate).map(|spec| (spec, range))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ChartKind;

    #[test]
    fn fenced_chart_block_leaves_no_text() {
        let input = "```chart\n{\"type\":\"pie\",\"data\":[{\"name\":\"A\",\"value\":1}]}\n```";
        let out = extract_chart(input);
        let spec = out.spec.unwrap();
        assert_eq!(spec.kind, ChartKind::Pie);
        assert_eq!(spec.data[0].name, "A");
        assert_eq!(out.text, "");
        assert_eq!(out.strategy, Some(Strategy::FencedBlock));
    }

    #[test]
    fn fenced_json_block_keeps_surrounding_prose() {
        let input = "Here are the numbers:\n```json\n{\"type\":\"bar\",\"title\":\"Tickets\",\"data\":[{\"name\":\"Mon\",\"value\":4}]}\n```\nLet me know.";
        let out = extract_chart(input);
        assert_eq!(out.spec.unwrap().title.as_deref(), Some("Tickets"));
        assert_eq!(out.text, "Here are the numbers:\n\nLet me know.");
    }

    #[test]
    fn plain_text_is_returned_unchanged() {
        let input = "  Thanks, I'll check your account.  ";
        let out = extract_chart(input);
        assert!(out.spec.is_none());
        assert_eq!(out.text, input);
        assert_eq!(out.strategy, None);
    }

    #[test]
    fn malformed_fence_falls_through_to_bare_object() {
        let input = "```json\n{\"type\":\"pie\",\"data\":[\n```\nActual: {\"type\":\"bar\",\"data\":[{\"name\":\"B\",\"value\":2}]}";
        let out = extract_chart(input);
        let spec = out.spec.unwrap();
        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!(spec.data[0].value, 2.0);
    }

    #[test]
    fn chart_token_then_nested_object() {
        let input = r#"Chart: {"type":"line","data":[{"name":"Q1","value":1,"meta":{"note":"}"}}]} done"#;
        let out = extract_chart(input);
        let spec = out.spec.unwrap();
        assert_eq!(spec.kind, ChartKind::Line);
        assert_eq!(out.text, "Chart:  done");
        assert_eq!(out.strategy, Some(Strategy::ChartToken));
    }

    #[test]
    fn bare_object_with_unknown_type_is_ignored() {
        let input = r#"payload {"type":"donut","data":[]} end"#;
        let out = extract_chart(input);
        assert!(out.spec.is_none());
        assert_eq!(out.text, input);
    }

    #[test]
    fn bare_object_found_without_token() {
        let input = r#"Summary {"type":"pie","data":[{"name":"open","value":3},{"name":"closed","value":5}]}"#;
        let out = extract_chart(input);
        assert_eq!(out.spec.unwrap().data.len(), 2);
        assert_eq!(out.text, "Summary");
        assert_eq!(out.strategy, Some(Strategy::BareObject));
    }

    #[test]
    fn unrelated_json_is_left_alone() {
        let input = r#"config {"retries": 3}"#;
        let out = extract_chart(input);
        assert!(out.spec.is_none());
        assert_eq!(out.text, input);
    }
}
