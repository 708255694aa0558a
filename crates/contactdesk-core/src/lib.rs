// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for contactdesk.
//!
//! This crate provides the domain types, the shared error type, the store
//! traits, and the per-conversation change feed used throughout the
//! workspace.

pub mod error;
pub mod feed;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export key items at crate root for ergonomic imports.
pub use error::DeskError;
pub use feed::ChangeFeed;
pub use types::{
    Channel, ChannelConversationState, Conversation, ConversationFilter, ConversationStats,
    ConversationStatus, ConversationUpdate, CountBucket, Customer, Message, NewConversation,
    Priority, RealtimeFrame, SendMessageRequest, SenderType, Sentiment,
};

pub use traits::{ChannelStateStore, ConversationStore};
