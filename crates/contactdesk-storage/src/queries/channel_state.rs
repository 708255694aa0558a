// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-specific conversation state (the secondary store).

use contactdesk_core::DeskError;
use contactdesk_core::types::{
    Channel, ChannelConversationState, ConversationStatus, Priority, format_timestamp,
    now_timestamp,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{CHANNEL_STATE_COLUMNS, channel_state_from_row};

/// Insert or refresh the mirror row for a conversation.
///
/// A new row copies status and priority from the conversation when it
/// exists. An existing row keeps its external reference unless a new one is given.
pub async fn upsert_channel_state(
    db: &Database,
    conversation_id: &str,
    channel: Channel,
    external_ref: Option<&str>,
) -> Result<(), DeskError> {
    let conversation_id = conversation_id.to_string();
    let external_ref = external_ref.map(str::to_string);
    let now = format_timestamp(&now_timestamp());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO channel_conversations
                     (conversation_id, channel, external_ref, status, priority, updated_at)
                 VALUES (
                     ?1, ?2, ?3,
                     COALESCE((SELECT status FROM conversations WHERE id = ?1), ?5),
                     COALESCE((SELECT priority FROM conversations WHERE id = ?1), ?6),
                     ?4
                 )
                 ON CONFLICT(conversation_id) DO UPDATE SET
                     external_ref = COALESCE(excluded.external_ref, channel_conversations.external_ref),
                     updated_at = excluded.updated_at",
                params![
                    conversation_id,
                    channel.to_string(),
                    external_ref,
                    now,
                    ConversationStatus::Open.to_string(),
                    Priority::Medium.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get the mirror row for a conversation.
pub async fn get_channel_state(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<ChannelConversationState>, DeskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ChannelConversationState>, rusqlite::Error> {
            let sql = format!(
                "SELECT {CHANNEL_STATE_COLUMNS} FROM channel_conversations WHERE conversation_id = ?1"
            );
            conn.query_row(&sql, params![conversation_id], channel_state_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Set status (and optionally priority). Returns `false` when no row exists.
pub async fn update_channel_state(
    db: &Database,
    conversation_id: &str,
    status: ConversationStatus,
    priority: Option<Priority>,
) -> Result<bool, DeskError> {
    let conversation_id = conversation_id.to_string();
    let priority = priority.map(|p| p.to_string());
    let now = format_timestamp(&now_timestamp());
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE channel_conversations
                 SET status = ?1, priority = COALESCE(?2, priority), updated_at = ?3
                 WHERE conversation_id = ?4",
                params![status.to_string(), priority, now, conversation_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Find the mirror row owning a provider reference on a channel.
pub async fn find_by_external_ref(
    db: &Database,
    channel: Channel,
    external_ref: &str,
) -> Result<Option<ChannelConversationState>, DeskError> {
    let external_ref = external_ref.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ChannelConversationState>, rusqlite::Error> {
            let sql = format!(
                "SELECT {CHANNEL_STATE_COLUMNS} FROM channel_conversations
                 WHERE channel = ?1 AND external_ref = ?2
                 ORDER BY updated_at DESC LIMIT 1"
            );
            conn.query_row(
                &sql,
                params![channel.to_string(), external_ref],
                channel_state_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
