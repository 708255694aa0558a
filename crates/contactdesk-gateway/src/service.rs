// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Desk operations shared by the REST handlers and the webhook receivers.
//!
//! The service owns the primary [`ConversationStore`], an optional secondary
//! [`ChannelStateStore`], and the [`ChangeFeed`]. Every message it writes is
//! published to the feed after the insert succeeds.

use std::sync::Arc;

use tracing::{debug, info, warn};

use contactdesk_core::types::{
    Channel, Conversation, ConversationFilter, ConversationStats, ConversationStatus,
    ConversationUpdate, Message, NewConversation, Priority, SendMessageRequest, SenderType,
};
use contactdesk_core::{ChangeFeed, ChannelStateStore, ConversationStore, DeskError};

/// A provider contact normalized at the webhook boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundContact {
    pub channel: Channel,
    /// Phone number or email address of the sender.
    pub address: String,
    pub display_name: Option<String>,
    /// Provider thread, message or call identifier.
    pub external_ref: Option<String>,
    pub content: String,
    /// Used as the subject when a new conversation is opened.
    pub subject: Option<String>,
}

pub struct DeskService {
    store: Arc<dyn ConversationStore>,
    channel_state: Option<Arc<dyn ChannelStateStore>>,
    feed: ChangeFeed,
}

impl DeskService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        channel_state: Option<Arc<dyn ChannelStateStore>>,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            store,
            channel_state,
            feed,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub async fn create_conversation(
        &self,
        new: &NewConversation,
    ) -> Result<Conversation, DeskError> {
        new.validate()?;
        let conversation = self.store.create_conversation(new).await?;
        info!(
            conversation_id = %conversation.id,
            channel = %conversation.channel,
            "conversation created"
        );
        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Conversation, DeskError> {
        self.store
            .get_conversation(id)
            .await?
            .ok_or_else(|| DeskError::conversation_not_found(id))
    }

    pub async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, DeskError> {
        self.store.list_conversations(filter).await
    }

    pub async fn update_conversation(
        &self,
        id: &str,
        update: &ConversationUpdate,
    ) -> Result<Conversation, DeskError> {
        self.store
            .update_conversation(id, update)
            .await?
            .ok_or_else(|| DeskError::conversation_not_found(id))
    }

    pub async fn conversation_stats(&self) -> Result<ConversationStats, DeskError> {
        self.store.conversation_stats().await
    }

    /// Messages of an existing conversation, oldest first.
    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, DeskError> {
        self.get_conversation(conversation_id).await?;
        self.store.list_messages(conversation_id).await
    }

    /// Validate, insert, then publish a message.
    pub async fn send_message(&self, req: &SendMessageRequest) -> Result<Message, DeskError> {
        req.validate()?;
        let message = self.store.insert_message(req).await?;
        let delivered = self.feed.publish(&message);
        debug!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            delivered,
            "message stored"
        );
        Ok(message)
    }

    /// Escalate a conversation.
    ///
    /// The primary row is authoritative: a missing row or a failed update is
    /// returned. The channel-state mirror is updated best effort.
    pub async fn escalate(&self, conversation_id: &str) -> Result<(), DeskError> {
        if !self.store.escalate_conversation(conversation_id).await? {
            return Err(DeskError::conversation_not_found(conversation_id));
        }
        info!(conversation_id, "conversation escalated");

        let Some(secondary) = &self.channel_state else {
            return Ok(());
        };
        match secondary
            .update_channel_state(
                conversation_id,
                ConversationStatus::Escalated,
                Some(Priority::High),
            )
            .await
        {
            Ok(true) => debug!(conversation_id, "channel state escalated"),
            Ok(false) => debug!(conversation_id, "no channel state to escalate"),
            Err(e) => warn!(
                conversation_id,
                error = %e,
                "failed to escalate channel state, primary row already updated"
            ),
        }
        Ok(())
    }

    /// Record an inbound provider contact as a customer message.
    ///
    /// Resolves the sender to a customer, reuses their newest open conversation
    /// on the channel (or the one bound to `external_ref`), otherwise opens a
    /// new one.
    pub async fn ingest(&self, contact: InboundContact) -> Result<Message, DeskError> {
        if contact.content.trim().is_empty() {
            return Err(DeskError::Validation(
                "content must be at least 1 character".into(),
            ));
        }

        let customer = self
            .store
            .find_or_create_customer(
                contact.channel,
                &contact.address,
                contact.display_name.as_deref(),
            )
            .await?;

        let conversation = match self.conversation_for_ref(&contact).await? {
            Some(conversation) => conversation,
            None => match self
                .store
                .find_open_conversation(&customer.id, contact.channel)
                .await?
            {
                Some(conversation) => conversation,
                None => {
                    self.create_conversation(&NewConversation {
                        customer_id: customer.id.clone(),
                        subject: contact.subject.clone(),
                        channel: contact.channel,
                        priority: Priority::default(),
                    })
                    .await?
                }
            },
        };

        let req = SendMessageRequest {
            conversation_id: conversation.id.clone(),
            sender_type: SenderType::Customer,
            sender_customer_id: Some(customer.id.clone()),
            sender_agent_id: None,
            content: contact.content,
            is_internal: false,
        };
        req.validate()?;
        let message = self.store.insert_message(&req).await?;

        if let Some(secondary) = &self.channel_state
            && let Err(e) = secondary
                .upsert_channel_state(
                    &conversation.id,
                    contact.channel,
                    contact.external_ref.as_deref(),
                )
                .await
        {
            warn!(conversation_id = %conversation.id, error = %e, "failed to upsert channel state");
        }

        self.feed.publish(&message);
        info!(
            conversation_id = %conversation.id,
            channel = %contact.channel,
            message_id = %message.id,
            "inbound contact recorded"
        );
        Ok(message)
    }

    /// Close the channel state bound to a provider reference.
    ///
    /// Returns `false` when no channel state matches.
    pub async fn close_channel(
        &self,
        channel: Channel,
        external_ref: &str,
    ) -> Result<bool, DeskError> {
        let Some(secondary) = &self.channel_state else {
            return Ok(false);
        };
        let Some(state) = secondary.find_by_external_ref(channel, external_ref).await? else {
            debug!(%channel, external_ref, "no channel state for provider reference");
            return Ok(false);
        };
        let closed = secondary
            .update_channel_state(&state.conversation_id, ConversationStatus::Closed, None)
            .await?;
        info!(conversation_id = %state.conversation_id, %channel, "channel state closed");
        Ok(closed)
    }

    async fn conversation_for_ref(
        &self,
        contact: &InboundContact,
    ) -> Result<Option<Conversation>, DeskError> {
        let (Some(secondary), Some(external_ref)) = (&self.channel_state, &contact.external_ref)
        else {
            return Ok(None);
        };
        let Some(state) = secondary
            .find_by_external_ref(contact.channel, external_ref)
            .await?
        else {
            return Ok(None);
        };
        let conversation = self.store.get_conversation(&state.conversation_id).await?;
        Ok(conversation.filter(|c| c.status != ConversationStatus::Closed))
    }
}
