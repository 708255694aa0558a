// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation message reconciliation.
//!
//! [`MessageLog`] merges three sources into one list: history rows, optimistic
//! placeholders for in-flight sends, and realtime inserts. Entries are keyed
//! by id and every authoritative id appears at most once. The visible order
//! is `(created_at, id)` and is recomputed after every mutation.
//!
//! An insert from the current agent whose content matches an in-flight
//! placeholder replaces that placeholder instead of adding a second entry.
//!
//! A reload bracketed by [`MessageLog::begin_load`] replaces the authoritative
//! rows with the fetched ones. Rows that arrived after `begin_load` survive,
//! since the fetch may have been answered before they were written.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use contactdesk_core::types::{Message, SenderType, now_timestamp};

/// Prefix of locally generated placeholder ids.
pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub message: Message,
    /// `true` while the entry is an optimistic placeholder.
    pub pending: bool,
}

/// What [`MessageLog::remote_insert`] did with a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Inserted,
    /// The row replaced the placeholder with this local id.
    Adopted { local_id: String },
    /// The id was already present.
    Duplicate,
    /// The row belongs to another conversation.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct MessageLog {
    conversation_id: String,
    agent_id: String,
    entries: HashMap<String, LogEntry>,
    /// Placeholder ids in send order.
    pending: Vec<String>,
    /// Authoritative ids.
    seen: HashSet<String>,
    /// Authoritative ids applied since the last `begin_load`.
    since_load: HashSet<String>,
    order: Vec<String>,
}

impl MessageLog {
    pub fn new(conversation_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            agent_id: agent_id.into(),
            entries: HashMap::new(),
            pending: Vec::new(),
            seen: HashSet::new(),
            since_load: HashSet::new(),
            order: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Entries in display order.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Mark the start of a history fetch.
    pub fn begin_load(&mut self) {
        self.since_load.clear();
    }

    /// Apply fetched history.
    ///
    /// Authoritative rows missing from `rows` are dropped unless they arrived
    /// after [`begin_load`](Self::begin_load). Rows already present are kept
    /// as they are and placeholders are untouched unless a row adopts them.
    pub fn history_loaded(&mut self, rows: Vec<Message>) {
        let total = rows.len();
        let stale: Vec<String> = {
            let fetched: HashSet<&str> = rows.iter().map(|row| row.id.as_str()).collect();
            self.seen
                .iter()
                .filter(|id| !fetched.contains(id.as_str()) && !self.since_load.contains(*id))
                .cloned()
                .collect()
        };
        for id in &stale {
            self.seen.remove(id);
            self.entries.remove(id);
        }
        let mut added = 0;
        for row in rows {
            if row.conversation_id != self.conversation_id {
                debug!(
                    message_id = %row.id,
                    conversation_id = %row.conversation_id,
                    "dropping history row for another conversation"
                );
                continue;
            }
            if let Some(local_id) = self.matching_placeholder(&row) {
                self.remove_placeholder(&local_id);
            }
            if self.insert_authoritative(row) {
                added += 1;
            }
        }
        self.resort();
        trace!(
            conversation_id = %self.conversation_id,
            total,
            added,
            removed = stale.len(),
            "history applied"
        );
    }

    /// Append a placeholder for an outgoing agent message and return its local id.
    pub fn begin_send(&mut self, content: &str, is_internal: bool) -> String {
        let local_id = format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4());
        let placeholder = Message {
            id: local_id.clone(),
            conversation_id: self.conversation_id.clone(),
            sender_type: SenderType::Agent,
            sender_customer_id: None,
            sender_agent_id: Some(self.agent_id.clone()),
            content: content.to_string(),
            is_internal,
            created_at: now_timestamp(),
        };
        self.entries.insert(
            local_id.clone(),
            LogEntry {
                message: placeholder,
                pending: true,
            },
        );
        self.pending.push(local_id.clone());
        self.resort();
        local_id
    }

    /// The write for `local_id` returned `row`.
    pub fn send_succeeded(&mut self, local_id: &str, row: Message) {
        self.remove_placeholder(local_id);
        if row.conversation_id == self.conversation_id {
            self.insert_authoritative(row);
        }
        self.resort();
    }

    /// The write for `local_id` failed. Drops the placeholder.
    pub fn send_failed(&mut self, local_id: &str) {
        self.remove_placeholder(local_id);
        self.resort();
    }

    /// Apply a row pushed by the realtime feed.
    pub fn remote_insert(&mut self, row: Message) -> RemoteOutcome {
        if row.conversation_id != self.conversation_id {
            return RemoteOutcome::Ignored;
        }
        if self.seen.contains(&row.id) {
            return RemoteOutcome::Duplicate;
        }

        let outcome = match self.matching_placeholder(&row) {
            Some(local_id) => {
                self.remove_placeholder(&local_id);
                RemoteOutcome::Adopted { local_id }
            }
            None => RemoteOutcome::Inserted,
        };
        self.insert_authoritative(row);
        self.resort();
        outcome
    }

    fn insert_authoritative(&mut self, row: Message) -> bool {
        if !self.seen.insert(row.id.clone()) {
            return false;
        }
        self.since_load.insert(row.id.clone());
        self.entries.insert(
            row.id.clone(),
            LogEntry {
                message: row,
                pending: false,
            },
        );
        true
    }

    fn remove_placeholder(&mut self, local_id: &str) {
        if let Some(pos) = self.pending.iter().position(|id| id == local_id) {
            self.pending.remove(pos);
            self.entries.remove(local_id);
        }
    }

    /// Oldest in-flight placeholder this row could be the echo of.
    fn matching_placeholder(&self, row: &Message) -> Option<String> {
        if row.sender_type != SenderType::Agent
            || row.sender_agent_id.as_deref() != Some(self.agent_id.as_str())
        {
            return None;
        }
        self.pending
            .iter()
            .find(|id| {
                self.entries.get(id.as_str()).is_some_and(|entry| {
                    entry.message.content == row.content
                        && entry.message.is_internal == row.is_internal
                })
            })
            .cloned()
    }

    fn resort(&mut self) {
        let entries = &self.entries;
        let mut order: Vec<String> = entries.keys().cloned().collect();
        order.sort_by(|a, b| {
            let (ma, mb) = (&entries[a].message, &entries[b].message);
            ma.created_at.cmp(&mb.created_at).then_with(|| ma.id.cmp(&mb.id))
        });
        self.order = order;
    }
}
