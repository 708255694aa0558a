// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row decoding shared by the query modules.
//!
//! Enums are stored as their lowercase names and timestamps as RFC 3339
//! text. Timestamp columns written by other tools may hold integers or
//! SQLite's own date format, so decoding is lenient there.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use contactdesk_core::types::{
    ChannelConversationState, Conversation, Customer, Message, parse_timestamp,
};
use rusqlite::Row;
use rusqlite::types::{Type, ValueRef};

pub(crate) const CONVERSATION_COLUMNS: &str = "id, customer_id, subject, channel, status, priority, \
     sentiment, escalation_risk, assigned_agent_id, start_time, last_message_time, created_at";

pub(crate) const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_type, sender_customer_id, \
     sender_agent_id, content, is_internal, created_at";

pub(crate) const CUSTOMER_COLUMNS: &str = "id, display_name, phone, email, created_at";

pub(crate) const CHANNEL_STATE_COLUMNS: &str =
    "conversation_id, channel, external_ref, status, priority, updated_at";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// Decode a lowercase enum name.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: T::Err| conversion_error(idx, format!("`{raw}`: {e}")))
}

fn optional_enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| conversion_error(idx, format!("`{raw}`: {e}"))),
        None => Ok(None),
    }
}

/// Decode a nullable timestamp. Unreadable values decode as `None`.
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_timestamp),
        ValueRef::Integer(secs) => Utc.timestamp_opt(secs, 0).single(),
        ValueRef::Real(secs) => Utc.timestamp_millis_opt((secs * 1000.0) as i64).single(),
    })
}

pub(crate) fn required_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    timestamp_column(row, idx)?
        .ok_or_else(|| conversion_error(idx, "missing or unreadable timestamp".to_string()))
}

pub(crate) fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        subject: row.get(2)?,
        channel: enum_column(row, 3)?,
        status: enum_column(row, 4)?,
        priority: enum_column(row, 5)?,
        sentiment: optional_enum_column(row, 6)?,
        escalation_risk: row.get(7)?,
        assigned_agent_id: row.get(8)?,
        start_time: timestamp_column(row, 9)?,
        last_message_time: timestamp_column(row, 10)?,
        created_at: required_timestamp(row, 11)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_type: enum_column(row, 2)?,
        sender_customer_id: row.get(3)?,
        sender_agent_id: row.get(4)?,
        content: row.get(5)?,
        is_internal: row.get(6)?,
        created_at: required_timestamp(row, 7)?,
    })
}

pub(crate) fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        display_name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        created_at: required_timestamp(row, 4)?,
    })
}

pub(crate) fn channel_state_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelConversationState> {
    Ok(ChannelConversationState {
        conversation_id: row.get(0)?,
        channel: enum_column(row, 1)?,
        external_ref: row.get(2)?,
        status: enum_column(row, 3)?,
        priority: enum_column(row, 4)?,
        updated_at: required_timestamp(row, 5)?,
    })
}
