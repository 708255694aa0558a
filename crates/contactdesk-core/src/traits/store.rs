// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary conversation store.

use async_trait::async_trait;

use crate::error::DeskError;
use crate::types::{
    Channel, Conversation, ConversationFilter, ConversationStats, ConversationUpdate, Customer,
    Message, NewConversation, SendMessageRequest,
};

/// The authoritative store for conversations, messages and customers.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Create a conversation with status `open` and both temporal fields set to now.
    async fn create_conversation(&self, new: &NewConversation) -> Result<Conversation, DeskError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, DeskError>;

    async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, DeskError>;

    /// Apply a partial update. Returns `None` when the conversation does not exist.
    async fn update_conversation(
        &self,
        id: &str,
        update: &ConversationUpdate,
    ) -> Result<Option<Conversation>, DeskError>;

    /// Mark a conversation escalated (status, high priority, risk flag).
    ///
    /// Returns `false` when no conversation has this id.
    async fn escalate_conversation(&self, id: &str) -> Result<bool, DeskError>;

    async fn conversation_stats(&self) -> Result<ConversationStats, DeskError>;

    /// Newest conversation for a customer on a channel that is not closed.
    async fn find_open_conversation(
        &self,
        customer_id: &str,
        channel: Channel,
    ) -> Result<Option<Conversation>, DeskError>;

    /// Insert a message, assigning its id and timestamp, and advance the
    /// conversation's `last_message_time`.
    async fn insert_message(&self, req: &SendMessageRequest) -> Result<Message, DeskError>;

    /// All messages of a conversation, ascending by creation time.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, DeskError>;

    /// Resolve a customer by phone number or email address, creating one on first contact.
    async fn find_or_create_customer(
        &self,
        channel: Channel,
        address: &str,
        display_name: Option<&str>,
    ) -> Result<Customer, DeskError>;

    async fn health_check(&self) -> Result<(), DeskError>;

    /// Flush pending writes and release the connection.
    async fn close(&self) -> Result<(), DeskError>;
}
