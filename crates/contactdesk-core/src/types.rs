// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the gateway, and the delivery client.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Channel a conversation arrives on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Voice,
    Chat,
    Email,
    Whatsapp,
    Sms,
    #[default]
    App,
}

/// Where a conversation sits in the handling lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Open,
    Active,
    Waiting,
    Escalated,
    Closed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SenderType {
    Customer,
    Agent,
}

/// A customer-facing interaction thread on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub customer_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub channel: Channel,
    pub status: ConversationStatus,
    pub priority: Priority,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub escalation_risk: bool,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One authored unit of content within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_type: SenderType,
    #[serde(default)]
    pub sender_customer_id: Option<String>,
    #[serde(default)]
    pub sender_agent_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// A contact person on the customer side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Channel-specific mirror of a conversation's handling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConversationState {
    pub conversation_id: String,
    pub channel: Channel,
    #[serde(default)]
    pub external_ref: Option<String>,
    pub status: ConversationStatus,
    pub priority: Priority,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConversation {
    pub customer_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub priority: Priority,
}

/// Request body for sending a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: String,
    pub sender_type: SenderType,
    #[serde(default)]
    pub sender_customer_id: Option<String>,
    #[serde(default)]
    pub sender_agent_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
}

/// Partial update of a conversation's mutable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationUpdate {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
}

impl ConversationUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.sentiment.is_none()
            && self.assigned_agent_id.is_none()
    }
}

/// Inbox filter for listing conversations. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationFilter {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
}

/// One named count, shaped like a chart data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountBucket {
    pub name: String,
    pub value: i64,
}

/// Conversation counts grouped for dashboard charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub by_status: Vec<CountBucket>,
    pub by_channel: Vec<CountBucket>,
}

/// A frame pushed over a realtime subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RealtimeFrame {
    /// Sent once when the subscription is established.
    Subscribed { conversation_id: String },
    /// A row was inserted into `table`.
    Insert { table: String, record: Message },
}

impl RealtimeFrame {
    pub fn message_insert(record: Message) -> Self {
        RealtimeFrame::Insert {
            table: "messages".to_string(),
            record,
        }
    }
}

/// Format a timestamp the way rows store it: RFC 3339, UTC, milliseconds.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time truncated to the stored millisecond precision.
pub fn now_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS[.fff]` form SQLite's own
/// date functions produce (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
