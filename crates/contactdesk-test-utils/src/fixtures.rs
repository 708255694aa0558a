// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request builders for common test data.

use contactdesk_core::types::{
    Channel, NewConversation, Priority, SendMessageRequest, SenderType,
};

pub const TEST_AGENT: &str = "agent-1";
pub const TEST_CUSTOMER: &str = "cust-1";

pub fn new_conversation(channel: Channel) -> NewConversation {
    NewConversation {
        customer_id: TEST_CUSTOMER.to_string(),
        subject: Some("Order never arrived".to_string()),
        channel,
        priority: Priority::default(),
    }
}

pub fn customer_message(conversation_id: &str, content: &str) -> SendMessageRequest {
    SendMessageRequest {
        conversation_id: conversation_id.to_string(),
        sender_type: SenderType::Customer,
        sender_customer_id: Some(TEST_CUSTOMER.to_string()),
        sender_agent_id: None,
        content: content.to_string(),
        is_internal: false,
    }
}

pub fn agent_message(conversation_id: &str, content: &str, is_internal: bool) -> SendMessageRequest {
    SendMessageRequest {
        conversation_id: conversation_id.to_string(),
        sender_type: SenderType::Agent,
        sender_customer_id: None,
        sender_agent_id: Some(TEST_AGENT.to_string()),
        content: content.to_string(),
        is_internal,
    }
}
