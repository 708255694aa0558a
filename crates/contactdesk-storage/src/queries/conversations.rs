// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD, inbox listing and escalation.

use contactdesk_core::DeskError;
use contactdesk_core::types::{
    Channel, Conversation, ConversationFilter, ConversationStats, ConversationStatus,
    ConversationUpdate, CountBucket, NewConversation, Priority, format_timestamp, now_timestamp,
};
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{CONVERSATION_COLUMNS, conversation_from_row};

/// Create a conversation with status `open` and both temporal fields set to now.
pub async fn create_conversation(
    db: &Database,
    new: &NewConversation,
) -> Result<Conversation, DeskError> {
    let now = now_timestamp();
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: new.customer_id.clone(),
        subject: new.subject.clone(),
        channel: new.channel,
        status: ConversationStatus::Open,
        priority: new.priority,
        sentiment: None,
        escalation_risk: false,
        assigned_agent_id: None,
        start_time: Some(now),
        last_message_time: Some(now),
        created_at: now,
    };

    let row = conversation.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let ts = format_timestamp(&now);
            conn.execute(
                "INSERT INTO conversations (id, customer_id, subject, channel, status, priority,
                     escalation_risk, start_time, last_message_time, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7, ?7)",
                params![
                    row.id,
                    row.customer_id,
                    row.subject,
                    row.channel.to_string(),
                    row.status.to_string(),
                    row.priority.to_string(),
                    ts,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

    Ok(conversation)
}

/// Get a conversation by ID.
pub async fn get_conversation(db: &Database, id: &str) -> Result<Option<Conversation>, DeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            conn.query_row(&sql, params![id], conversation_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List conversations matching a filter, most recently active first.
pub async fn list_conversations(
    db: &Database,
    filter: &ConversationFilter,
) -> Result<Vec<Conversation>, DeskError> {
    let mut clauses = Vec::new();
    let mut values: Vec<String> = Vec::new();
    if let Some(status) = filter.status {
        values.push(status.to_string());
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(channel) = filter.channel {
        values.push(channel.to_string());
        clauses.push(format!("channel = ?{}", values.len()));
    }
    if let Some(priority) = filter.priority {
        values.push(priority.to_string());
        clauses.push(format!("priority = ?{}", values.len()));
    }
    if let Some(agent) = &filter.assigned_agent_id {
        values.push(agent.clone());
        clauses.push(format!("assigned_agent_id = ?{}", values.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations {where_clause}
         ORDER BY last_message_time IS NULL, last_message_time DESC, created_at DESC, id ASC"
    );

    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), conversation_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a partial update. Returns the updated row, or `None` if it does not exist.
pub async fn update_conversation(
    db: &Database,
    id: &str,
    update: &ConversationUpdate,
) -> Result<Option<Conversation>, DeskError> {
    let mut sets = Vec::new();
    let mut values: Vec<String> = Vec::new();
    if let Some(status) = update.status {
        values.push(status.to_string());
        sets.push(format!("status = ?{}", values.len()));
    }
    if let Some(priority) = update.priority {
        values.push(priority.to_string());
        sets.push(format!("priority = ?{}", values.len()));
    }
    if let Some(sentiment) = update.sentiment {
        values.push(sentiment.to_string());
        sets.push(format!("sentiment = ?{}", values.len()));
    }
    if let Some(agent) = &update.assigned_agent_id {
        values.push(agent.clone());
        sets.push(format!("assigned_agent_id = ?{}", values.len()));
    }
    values.push(id.to_string());
    let id_param = values.len();

    let update_sql = (!sets.is_empty()).then(|| {
        format!(
            "UPDATE conversations SET {} WHERE id = ?{id_param}",
            sets.join(", ")
        )
    });
    let select_sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
    let id = id.to_string();

    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if let Some(sql) = &update_sql {
                tx.execute(sql, params_from_iter(values.iter()))?;
            }
            let updated = tx
                .query_row(&select_sql, params![id], conversation_from_row)
                .optional()?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a conversation escalated: status escalated, priority high, risk flag set.
///
/// Returns `false` when no row has this id.
pub async fn escalate_conversation(db: &Database, id: &str) -> Result<bool, DeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE conversations SET status = ?1, priority = ?2, escalation_risk = 1
                 WHERE id = ?3",
                params![
                    ConversationStatus::Escalated.to_string(),
                    Priority::High.to_string(),
                    id
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Newest conversation for a customer on a channel that is not closed.
pub async fn find_open_conversation(
    db: &Database,
    customer_id: &str,
    channel: Channel,
) -> Result<Option<Conversation>, DeskError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE customer_id = ?1 AND channel = ?2 AND status != ?3
                 ORDER BY last_message_time DESC, created_at DESC
                 LIMIT 1"
            );
            conn.query_row(
                &sql,
                params![
                    customer_id,
                    channel.to_string(),
                    ConversationStatus::Closed.to_string()
                ],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Conversation counts grouped by status and by channel.
pub async fn conversation_stats(db: &Database) -> Result<ConversationStats, DeskError> {
    db.connection()
        .call(|conn| -> Result<ConversationStats, rusqlite::Error> {
            let grouped = |column: &str| -> Result<Vec<CountBucket>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {column}, COUNT(*) FROM conversations GROUP BY {column} ORDER BY {column}"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| {
                    Ok(CountBucket {
                        name: row.get(0)?,
                        value: row.get(1)?,
                    })
                })?;
                rows.collect()
            };
            Ok(ConversationStats {
                by_status: grouped("status")?,
                by_channel: grouped("channel")?,
            })
        })
        .await
        .map_err(map_tr_err)
}
