// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.

use contactdesk_core::DeskError;
use contactdesk_core::types::{Message, SendMessageRequest, format_timestamp, now_timestamp};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{MESSAGE_COLUMNS, message_from_row};

/// Insert a message and advance its conversation's `last_message_time`.
///
/// The id and `created_at` are assigned here. Returns `None` when the
/// conversation does not exist, in which case nothing is written.
pub async fn insert_message(
    db: &Database,
    req: &SendMessageRequest,
) -> Result<Option<Message>, DeskError> {
    let message = Message {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: req.conversation_id.clone(),
        sender_type: req.sender_type,
        sender_customer_id: req.sender_customer_id.clone(),
        sender_agent_id: req.sender_agent_id.clone(),
        content: req.content.clone(),
        is_internal: req.is_internal,
        created_at: now_timestamp(),
    };

    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
                params![message.conversation_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            let ts = format_timestamp(&message.created_at);
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_type, sender_customer_id,
                     sender_agent_id, content, is_internal, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id,
                    message.conversation_id,
                    message.sender_type.to_string(),
                    message.sender_customer_id,
                    message.sender_agent_id,
                    message.content,
                    message.is_internal,
                    ts,
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET last_message_time = ?1 WHERE id = ?2",
                params![ts, message.conversation_id],
            )?;
            tx.commit()?;
            Ok(Some(message))
        })
        .await
        .map_err(map_tr_err)
}

/// Get all messages of a conversation in chronological order, ties by id.
pub async fn list_messages(db: &Database, conversation_id: &str) -> Result<Vec<Message>, DeskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
