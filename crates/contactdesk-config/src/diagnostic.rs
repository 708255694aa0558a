// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config diagnostics.
//!
//! Figment reports where a key went wrong as a path; this module turns that
//! into a miette report pointing at the line in `contactdesk.toml`, and offers
//! a close match when an unknown key looks like a typo.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}` in {section}")]
    #[diagnostic(
        code(contactdesk::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// `[server]`, `[webhooks]`, or `the top level`.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a {section} key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(contactdesk::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(contactdesk::config::missing_key),
        help("set `{key}` in contactdesk.toml or through a CONTACTDESK_ variable")
    )]
    MissingKey { key: String },

    /// Values that parsed but make no sense together (see `validation`).
    #[error("validation error: {message}")]
    #[diagnostic(code(contactdesk::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(contactdesk::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let listing = format!("known keys here: {valid_keys}");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {listing}"),
        None => listing,
    }
}

/// Turn every error figment collected into a [`ConfigError`].
///
/// `toml_sources` are `(path, content)` pairs of the files that were merged;
/// they are only used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    let section: Vec<String> = error.path.iter().map(|p| p.to_string()).collect();
    match &error.kind {
        Kind::UnknownField(key, expected) => {
            let (span, src) = locate(error, toml_sources, &section, key);
            ConfigError::UnknownKey {
                key: key.clone(),
                section: section_label(&section),
                suggestion: suggest_key(key, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(key) => ConfigError::MissingKey {
            key: qualified(&section, key),
        },
        Kind::InvalidType(found, expected) => {
            // For type errors the path already ends in the offending key.
            let (span, src) = match section.split_last() {
                Some((key, parent)) => locate(error, toml_sources, parent, key),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: section.join("."),
                found: found.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn section_label(section: &[String]) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{}]", section.join("."))
    }
}

fn qualified(section: &[String], key: &str) -> String {
    section
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(key))
        .collect::<Vec<_>>()
        .join(".")
}

/// Pick the TOML file the error came from and find `key` in it.
fn locate(
    error: &figment::Error,
    toml_sources: &[(String, String)],
    section: &[String],
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // String-provided config carries no file metadata.
    let file = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    file.and_then(|(path, content)| {
        let offset = locate_key(content, section, key)?;
        Some((
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(path, content.clone())),
        ))
    })
    .unwrap_or((None, None))
}

/// Byte offset of `key` inside the `[section]` table of `content`.
///
/// Only lines between the section header and the next header are searched,
/// so a same-named key in another table is never reported. An empty
/// `section` means the keys before the first header.
pub fn locate_key(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut in_section = section.is_empty();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.split(']').next().unwrap_or_default().trim();
            in_section = name == wanted;
        } else if in_section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }

    None
}

/// Closest known key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render errors to a string with miette's graphical handler.
pub fn render_to_string(errors: &[ConfigError]) -> String {
    let handler = miette::GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let mut report = String::new();
        if handler.render_report(&mut report, error as &dyn Diagnostic).is_ok() {
            out.push_str(&report);
        } else {
            out.push_str(&format!("Error: {error}\n"));
        }
    }
    out
}

/// Print errors to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_to_string(errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn typo_suggestions() {
        let server = &["host", "port", "bearer_token", "public_base_url"];
        assert_eq!(suggest_key("prot", server).as_deref(), Some("port"));

        let webhooks = &["twilio_auth_token", "vapi_secret", "resend_signing_secret"];
        assert_eq!(suggest_key("vapi_secert", webhooks).as_deref(), Some("vapi_secret"));

        assert_eq!(suggest_key("zzzzzz", &["database_path", "wal_mode"]), None);
    }

    #[test]
    fn key_is_found_only_inside_its_section() {
        let content = "port = 1\n[logging]\nlevel = \"info\"\n\n[server]\nprot = 8080\n";
        let o = locate_key(content, &path(&["server"]), "prot").unwrap();
        assert_eq!(&content[o..o + 4], "prot");

        assert_eq!(locate_key(content, &path(&["logging"]), "prot"), None);
        assert_eq!(locate_key(content, &[], "port"), Some(0));
        assert_eq!(locate_key(content, &path(&["missing"]), "prot"), None);
    }

    #[test]
    fn key_offset_survives_crlf_and_indent() {
        let content = "[server]\r\nhost = \"0.0.0.0\"\r\n  prot= 1\r\n";
        let o = locate_key(content, &path(&["server"]), "prot").unwrap();
        assert_eq!(&content[o..o + 4], "prot");
    }

    #[test]
    fn key_prefix_does_not_match() {
        let content = "[server]\nports = 1\nport = 2\n";
        let o = locate_key(content, &path(&["server"]), "port").unwrap();
        assert_eq!(&content[o..o + 8], "port = 2");
    }

    #[test]
    fn section_labels() {
        assert_eq!(section_label(&[]), "the top level");
        assert_eq!(section_label(&path(&["server"])), "[server]");
        assert_eq!(qualified(&path(&["storage"]), "database_path"), "storage.database_path");
    }

    #[test]
    fn rendered_report_names_the_suggestion() {
        let errors = vec![ConfigError::UnknownKey {
            key: "prot".into(),
            section: "[server]".into(),
            suggestion: Some("port".into()),
            valid_keys: "host, port".into(),
            span: None,
            src: None,
        }];
        let text = render_to_string(&errors);
        assert!(text.contains("unknown configuration key `prot` in [server]"), "{text}");
        assert!(text.contains("did you mean `port`?"), "{text}");
    }
}
