// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait definitions.
//!
//! The gateway talks to persistence only through these traits and uses
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod channel_state;
pub mod store;

pub use channel_state::ChannelStateStore;
pub use store::ConversationStore;
