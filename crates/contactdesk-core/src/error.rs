// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for contactdesk.

use thiserror::Error;

/// The primary error type shared by every contactdesk crate.
#[derive(Debug, Error)]
pub enum DeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, row decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A request was rejected before any write took place.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Channel provider errors (malformed webhook payload, bad signature).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network failures talking to the backend API or the realtime feed.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskError {
    /// Shorthand for a [`DeskError::NotFound`] on a conversation.
    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        DeskError::NotFound {
            entity: "conversation",
            id: id.into(),
        }
    }

    /// Whether the caller may simply re-invoke the failed operation.
    ///
    /// Network failures and timeouts are transient. Everything else needs a
    /// changed request or operator attention.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DeskError::Transport { .. } | DeskError::Timeout { .. })
    }
}
