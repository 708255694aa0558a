// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secondary, channel-specific conversation state.

use async_trait::async_trait;

use crate::error::DeskError;
use crate::types::{Channel, ChannelConversationState, ConversationStatus, Priority};

/// Channel-specific mirror of conversation state.
///
/// The general conversation table stays authoritative. Writes here are
/// best-effort and may diverge from it.
#[async_trait]
pub trait ChannelStateStore: Send + Sync + 'static {
    /// Insert or refresh the mirror row for a conversation.
    async fn upsert_channel_state(
        &self,
        conversation_id: &str,
        channel: Channel,
        external_ref: Option<&str>,
    ) -> Result<(), DeskError>;

    async fn get_channel_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ChannelConversationState>, DeskError>;

    /// Set status and priority. Returns `false` when no mirror row exists.
    async fn update_channel_state(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
        priority: Option<Priority>,
    ) -> Result<bool, DeskError>;

    /// Look up the conversation owning a provider reference (call id, thread id).
    async fn find_by_external_ref(
        &self,
        channel: Channel,
        external_ref: &str,
    ) -> Result<Option<ChannelConversationState>, DeskError>;
}
